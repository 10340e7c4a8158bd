fn main() -> std::io::Result<()> {
    let list = corsairlink::list()?;
    if list.is_empty() {
        println!("No power supplies found");
    } else {
        println!("Found power supplies:");
        for (idx, path) in list.iter().enumerate() {
            println!("{}: {}", idx, path.to_string_lossy());
        }
    }
    Ok(())
}
