use mecab_rs::{Mecab, TaggerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Uses MECAB_PATH when set, otherwise the usual install locations.
    let mut mecab = Mecab::new(TaggerConfig::default().with_node_format("%f[0]"))?;
    println!("MeCab {}", mecab.version());

    for dictionary in mecab.dictionaries() {
        println!(
            "dictionary: {} ({:?}, {}, {} words)",
            dictionary.filename, dictionary.dict_type, dictionary.charset, dictionary.size
        );
    }

    let text = "すもももももももものうち";
    print!("{}", mecab.parse(text)?);

    for node in mecab.parse_records(text)? {
        println!(
            "{} / {} (len={}, stat={:?}, cost={})",
            node.surface, node.feature, node.length, node.stat, node.cost
        );
    }

    Ok(())
}
