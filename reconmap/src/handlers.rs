use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use reconmap_core::data::{Database, NewManualEntry, NewRequest, RequestFilter};
use reconmap_core::report::{
    ReportFormat, gather_page_graph, gather_sitemap, gather_sitemap_graph, generate_json_graph,
    generate_json_tree, generate_text_tree, save_report,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use url::Url;

/// Expand `~` in a configured database path
pub fn resolve_db_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Open an existing database, pointing the user at `init` if there is none
pub fn open_database(path: &Path) -> Result<Database> {
    if !Database::exists(path) {
        bail!(
            "No database at {} (run `reconmap init` first)",
            path.display()
        );
    }
    Database::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Parse one capture line: `[METHOD] URL [STATUS [SIZE]]`.
///
/// Blank lines and `#` comments yield `None`. The URL is kept verbatim.
pub fn parse_log_line(line: &str) -> Option<NewRequest> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split_whitespace().peekable();
    let first = *fields.peek()?;
    let method = if first.chars().all(|c| c.is_ascii_alphabetic()) {
        fields.next();
        first.to_string()
    } else {
        "GET".to_string()
    };

    let Some(url) = fields.next() else {
        warn!("Skipping capture line without a URL: '{}'", line);
        return None;
    };

    let status_code = match fields.next().map(str::parse::<u16>) {
        Some(Ok(status)) => Some(status),
        Some(Err(_)) => {
            warn!("Skipping capture line with invalid status: '{}'", line);
            return None;
        }
        None => None,
    };

    let response_size = match fields.next().map(str::parse::<i64>) {
        Some(Ok(size)) => Some(size),
        Some(Err(_)) => {
            warn!("Skipping capture line with invalid size: '{}'", line);
            return None;
        }
        None => None,
    };

    Some(NewRequest {
        method,
        url: url.to_string(),
        status_code,
        response_size,
        page_id: None,
    })
}

/// Load and parse capture lines from a file
pub fn load_log_file(path: &Path) -> Result<Vec<NewRequest>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read capture file {}: {}", path.display(), e))?;

    let requests: Vec<NewRequest> = content.lines().filter_map(parse_log_line).collect();

    if requests.is_empty() {
        return Err(format!("No valid entries found in {}", path.display()));
    }

    Ok(requests)
}

// Stored anyway; the sitemap builder skips what it cannot parse
fn warn_if_unparseable(url: &str) {
    if Url::parse(url).is_err() {
        println!(
            "{} '{}' is not a valid URL and will not appear in the sitemap",
            "⚠".yellow().bold(),
            url
        );
    }
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn status_colored(status: Option<u16>) -> String {
    match status {
        Some(code @ 200..=299) => code.to_string().green().to_string(),
        Some(code @ 300..=399) => code.to_string().cyan().to_string(),
        Some(code @ 400..=499) => code.to_string().yellow().to_string(),
        Some(code @ 500..=599) => code.to_string().red().to_string(),
        Some(code) => code.to_string(),
        None => "---".bright_black().to_string(),
    }
}

fn target_id(db: &Database, args: &ArgMatches) -> Result<i64> {
    let name = args
        .get_one::<String>("target")
        .ok_or_else(|| anyhow!("--target is required"))?;
    Ok(db.get_target_by_name(name)?.id)
}

fn required_id(args: &ArgMatches) -> Result<i64> {
    args.get_one::<i64>("id")
        .copied()
        .ok_or_else(|| anyhow!("--id is required"))
}

fn emit(content: &str, output: Option<&PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            save_report(content, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", content),
    }
    Ok(())
}

pub fn handle_init(db_path: &Path, args: &ArgMatches) -> Result<()> {
    let force = args.get_flag("force");

    print_divider();
    println!("{}", "  RECONMAP INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    if Database::exists(db_path) {
        if !force {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!(
                "Database already exists at {} (use --force to overwrite)",
                db_path.display().to_string().bright_white()
            );
            return Ok(());
        }
        println!(
            "{} Deleting existing database (force mode)",
            "→".yellow().bold()
        );
        Database::drop(db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    Database::new(db_path).context("Failed to create database")?;
    info!("Initialized database at {}", db_path.display());
    println!(
        "{} Database initialized: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_target_create(db: &Database, args: &ArgMatches) -> Result<()> {
    let name = args.get_one::<String>("name").unwrap();
    let id = db.create_target(name)?;
    println!("{} Created target {} (id {})", "✓".green().bold(), name.bright_white(), id);
    Ok(())
}

pub fn handle_target_list(db: &Database) -> Result<()> {
    let targets = db.list_targets()?;
    if targets.is_empty() {
        println!("No targets yet. Create one with `reconmap target create -n <NAME>`.");
        return Ok(());
    }
    for target in targets {
        println!("  {:>4}  {}", target.id.to_string().cyan(), target.name);
    }
    Ok(())
}

pub fn handle_target_remove(db: &Database, args: &ArgMatches) -> Result<()> {
    let name = args.get_one::<String>("name").unwrap();
    let target = db.get_target_by_name(name)?;
    db.delete_target(target.id)?;
    println!("{} Removed target {}", "✓".green().bold(), name.bright_white());
    Ok(())
}

pub fn handle_log_add(db: &Database, args: &ArgMatches) -> Result<()> {
    let target = target_id(db, args)?;
    let request = NewRequest {
        method: args.get_one::<String>("method").unwrap().clone(),
        url: args.get_one::<String>("url").unwrap().clone(),
        status_code: args.get_one::<u16>("status").copied(),
        response_size: args.get_one::<i64>("size").copied(),
        page_id: args.get_one::<i64>("page").copied(),
    };

    warn_if_unparseable(&request.url);
    let id = db.log_request(target, &request)?;
    println!("{} Logged request {}", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_log_import(db: &Database, args: &ArgMatches) -> Result<()> {
    let target = target_id(db, args)?;
    let file = args.get_one::<PathBuf>("file").unwrap();
    let page_id = args.get_one::<i64>("page").copied();

    let requests = load_log_file(file).map_err(|e| anyhow!(e))?;
    for mut request in requests.iter().cloned() {
        request.page_id = page_id;
        warn_if_unparseable(&request.url);
        db.log_request(target, &request)?;
    }

    println!(
        "{} Imported {} requests from {}",
        "✓".green().bold(),
        requests.len().to_string().cyan(),
        file.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_log_list(db: &Database, args: &ArgMatches) -> Result<()> {
    let target = target_id(db, args)?;
    let filter = RequestFilter {
        method: args.get_one::<String>("method").cloned(),
        status_code: args.get_one::<u16>("status").copied(),
        favorites_only: args.get_flag("favorites"),
        url_contains: args.get_one::<String>("contains").cloned(),
        limit: args.get_one::<usize>("limit").copied(),
        offset: args.get_one::<usize>("offset").copied().unwrap_or(0),
    };

    let total = db.count_requests(target, &filter)?;
    let requests = db.list_requests(target, &filter)?;

    for request in &requests {
        let star = if request.is_favorite { " ★".yellow().to_string() } else { String::new() };
        println!(
            "  {:>6}  {:<7} {}  {}{}",
            request.id.to_string().cyan(),
            request.method,
            status_colored(request.status_code),
            request.url,
            star
        );
    }
    println!(
        "\n  {} of {} requests (offset {})",
        requests.len(),
        total,
        filter.offset
    );
    Ok(())
}

pub fn handle_log_favorite(db: &Database, args: &ArgMatches) -> Result<()> {
    let id = required_id(args)?;
    let favorite = !args.get_flag("unset");
    db.set_favorite(id, favorite)?;
    println!(
        "{} Request {} {}",
        "✓".green().bold(),
        id,
        if favorite { "marked as favorite" } else { "unmarked" }
    );
    Ok(())
}

pub fn handle_log_remove(db: &Database, args: &ArgMatches) -> Result<()> {
    let id = required_id(args)?;
    db.delete_request(id)?;
    println!("{} Removed request {}", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_manual_add(db: &Database, args: &ArgMatches) -> Result<()> {
    let target = target_id(db, args)?;
    let entry = NewManualEntry {
        folder_path: args.get_one::<String>("folder").unwrap().clone(),
        method: args.get_one::<String>("method").unwrap().clone(),
        path: args.get_one::<String>("path").unwrap().clone(),
        notes: args.get_one::<String>("notes").cloned(),
        source_log_id: args.get_one::<i64>("log-id").copied(),
    };

    let id = db.add_manual_entry(target, &entry)?;
    println!("{} Added manual entry {}", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_manual_list(db: &Database, args: &ArgMatches) -> Result<()> {
    let target = target_id(db, args)?;
    let entries = db.get_manual_entries(target)?;
    if entries.is_empty() {
        println!("No manual entries.");
        return Ok(());
    }

    for entry in entries {
        println!(
            "  {:>4}  {:<16} {:<7} {}{}",
            entry.id.to_string().cyan(),
            entry.folder_path,
            entry.method,
            entry.path,
            entry
                .notes
                .map(|n| format!("  {}", n.bright_black()))
                .unwrap_or_default()
        );
    }
    Ok(())
}

pub fn handle_manual_notes(db: &Database, args: &ArgMatches) -> Result<()> {
    let id = required_id(args)?;
    let notes = args.get_one::<String>("TEXT").map(String::as_str);
    db.update_manual_notes(id, notes)?;
    println!("{} Updated notes for entry {}", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_manual_remove(db: &Database, args: &ArgMatches) -> Result<()> {
    let id = required_id(args)?;
    db.delete_manual_entry(id)?;
    println!("{} Removed manual entry {}", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_page_start(db: &Database, args: &ArgMatches) -> Result<()> {
    let target = target_id(db, args)?;
    let name = args.get_one::<String>("name").unwrap();
    let description = args.get_one::<String>("description").map(String::as_str);

    let id = db.start_page(target, name, description)?;
    println!(
        "{} Recording page {} (id {}). Attach requests with --page {}",
        "✓".green().bold(),
        name.bright_white(),
        id,
        id
    );
    Ok(())
}

pub fn handle_page_end(db: &Database, args: &ArgMatches) -> Result<()> {
    let id = required_id(args)?;
    db.end_page(id)?;
    println!("{} Stopped recording page {}", "✓".green().bold(), id);
    Ok(())
}

pub fn handle_page_list(db: &Database, args: &ArgMatches) -> Result<()> {
    let target = target_id(db, args)?;
    for page in db.list_pages(target)? {
        let state = if page.end_time.is_some() {
            "done".green()
        } else {
            "recording".yellow()
        };
        println!(
            "  {:>4}  {:<24} {}  {}",
            page.id.to_string().cyan(),
            page.name,
            state,
            page.description.unwrap_or_default().bright_black()
        );
    }
    Ok(())
}

pub fn handle_sitemap(db: &Database, args: &ArgMatches) -> Result<()> {
    let name = args.get_one::<String>("target").unwrap();
    let target = db.get_target_by_name(name)?;
    let format = args
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let output = args.get_one::<PathBuf>("output");

    let roots = gather_sitemap(db, target.id).context("Failed to build sitemap")?;

    let content = match format {
        ReportFormat::Text => {
            // Saved reports stay plain text
            let header = match output {
                Some(_) => name.to_string(),
                None => name.bright_white().bold().to_string(),
            };
            format!("{}\n{}", header, generate_text_tree(&roots))
        }
        ReportFormat::Json => generate_json_tree(name, &roots)? + "\n",
    };
    emit(&content, output)
}

pub fn handle_graph(db: &Database, args: &ArgMatches) -> Result<()> {
    let name = args.get_one::<String>("target").unwrap();
    let target = db.get_target_by_name(name)?;

    let graph = if args.get_flag("pages") {
        gather_page_graph(db, target.id).context("Failed to build page graph")?
    } else {
        gather_sitemap_graph(db, target.id).context("Failed to build sitemap graph")?
    };

    let content = generate_json_graph(name, &graph)? + "\n";
    emit(&content, args.get_one::<PathBuf>("output"))
}
