use pdf2png::scrape::{scrape, Extraction, ScrapeConfig};

fn main() -> pdf2png::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    scrape(&ScrapeConfig::default(), &Extraction::Element("img".to_string()))?;

    Ok(())
}
