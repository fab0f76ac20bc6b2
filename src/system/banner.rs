const BANNER_LINES: [&str; 5] = [
    " _     _   _             _                     _     ",
    "| |__ | |_| |_ _ __  ___| |__   ___ _ __   ___| |__  ",
    "| '_ \\| __| __| '_ \\/ __| '_ \\ / _ \\ '_ \\ / __| '_ \\ ",
    "| | | | |_| |_| |_) \\__ \\ |_) |  __/ | | | (__| | | |",
    "|_| |_|\\__|\\__| .__/|___/_.__/ \\___|_| |_|\\___|_| |_|",
];

/// Startup banner followed by the version line.
pub(crate) fn banner_lines() -> Vec<String> {
    let mut lines: Vec<String> = BANNER_LINES.iter().map(|line| (*line).to_owned()).collect();
    lines.push(format!(
        "httpbench v{} | {} | HTTP load generation",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_LICENSE")
    ));
    lines
}

pub(crate) fn print_cli_banner() {
    for line in banner_lines() {
        eprintln!("{line}");
    }
}
