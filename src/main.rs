fn main() {
    if let Err(err) = md_navigator::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
