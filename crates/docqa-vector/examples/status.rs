use docqa_core::config::Config;
use docqa_vector::IndexStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let store = IndexStore::new(&settings.index.dir);
    match store.status().await? {
        Some((version, manifest)) => println!(
            "version={} embedder={} dim={} chunks={} built_at={}",
            version, manifest.embedder_id, manifest.dim, manifest.chunk_count, manifest.built_at
        ),
        None => println!("no index at {}", store.root().display()),
    }
    Ok(())
}
