use mecab_rs::{Mecab, ParseMode, TaggerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let n = std::env::args()
        .nth(1)
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(3);

    let mut mecab = Mecab::new(TaggerConfig::default().with_nbest(n))?;
    assert_eq!(mecab.mode(), ParseMode::NBest(n));

    let text = "東京都に住む";
    let mut current_path = None;
    mecab.parse_with(text, |node| {
        if current_path != Some(node.path) {
            current_path = Some(node.path);
            println!("-- path {}", node.path);
        }
        println!("{}", node.surface);
    })?;

    // Raw command-line options are passed to MeCab unchanged.
    let mut wakati = Mecab::new(format!("-Owakati -N{n}"))?;
    print!("{}", wakati.parse(text)?);

    Ok(())
}
