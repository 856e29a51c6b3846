pub mod data;
pub mod error;
pub mod map;
pub mod model;
pub mod path;
pub mod report;
pub mod sitemap;

use colored::Colorize;

pub use error::{MapError, Result};

pub fn print_banner() {
    let banner = r#"
   ┌─┐┌─┐┌─┐┌─┐┌┐┌┌┬┐┌─┐┌─┐
   ├┬┘├┤ │  │ ││││││├─┤├─┘
   ┴└─└─┘└─┘└─┘┘└┘┴ ┴┴ ┴┴
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "   {} {}\n",
        "sitemaps from captured traffic".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
}
