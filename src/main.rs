fn main() {
    if let Err(err) = gallery_bands::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
