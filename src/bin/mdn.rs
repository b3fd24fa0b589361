//! Short binary name (`mdn`) that forwards to the `md_navigator` library.
//! Keeping the alias as a real binary avoids shell alias requirements.

fn main() {
    if let Err(err) = md_navigator::entry() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
