use crate::CLAP_STYLING;
use clap::{arg, command};

fn target_arg() -> clap::Arg {
    arg!(-t --"target" <NAME>)
        .required(true)
        .help("The name of the target")
}

fn id_arg(help: &'static str) -> clap::Arg {
    arg!(--"id" <ID>)
        .required(true)
        .help(help)
        .value_parser(clap::value_parser!(i64))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("reconmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("reconmap")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Enable debug logging").required(false))
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .global(true)
                .help("Location of the reconmap database")
                .default_value("~/.config/reconmap/reconmap.db"),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the reconmap database on your filesystem")
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite any existing database at the configured location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("target")
                .about("Manage targets")
                .subcommand_required(true)
                .subcommand(
                    command!("create").about("Creates a target").arg(
                        arg!(-n --"name" <NAME>)
                            .required(true)
                            .help("The name of the target"),
                    ),
                )
                .subcommand(command!("list").about("List all targets"))
                .subcommand(
                    command!("remove")
                        .about("Removes a target and everything captured for it")
                        .arg(
                            arg!(-n --"name" <NAME>)
                                .required(true)
                                .help("The name of the target"),
                        ),
                ),
        )
        .subcommand(
            command!("log")
                .about("Manage captured requests")
                .subcommand_required(true)
                .subcommand(
                    command!("add")
                        .about("Record a captured request")
                        .arg(target_arg())
                        .arg(
                            arg!(-m --"method" <METHOD>)
                                .required(false)
                                .help("HTTP method")
                                .default_value("GET"),
                        )
                        .arg(arg!(-u --"url" <URL>).required(true).help("The request URL"))
                        .arg(
                            arg!(-s --"status" <CODE>)
                                .required(false)
                                .help("Response status code")
                                .value_parser(clap::value_parser!(u16)),
                        )
                        .arg(
                            arg!(--"size" <BYTES>)
                                .required(false)
                                .help("Response size in bytes")
                                .value_parser(clap::value_parser!(i64)),
                        )
                        .arg(
                            arg!(-p --"page" <PAGE_ID>)
                                .required(false)
                                .help("Attach the request to a recorded page")
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(
                    command!("import")
                        .about("Import captured requests from a file of 'METHOD URL [STATUS [SIZE]]' lines")
                        .arg(target_arg())
                        .arg(
                            arg!(-f --"file" <PATH>)
                                .required(true)
                                .help("Path to a newline-delimited capture file")
                                .value_parser(clap::value_parser!(std::path::PathBuf)),
                        )
                        .arg(
                            arg!(-p --"page" <PAGE_ID>)
                                .required(false)
                                .help("Attach the imported requests to a recorded page")
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(
                    command!("list")
                        .about("List captured requests")
                        .arg(target_arg())
                        .arg(arg!(-m --"method" <METHOD>).required(false).help("Only this method"))
                        .arg(
                            arg!(-s --"status" <CODE>)
                                .required(false)
                                .help("Only this status code")
                                .value_parser(clap::value_parser!(u16)),
                        )
                        .arg(
                            arg!(--"contains" <TEXT>)
                                .required(false)
                                .help("Only URLs containing this text"),
                        )
                        .arg(
                            arg!(--"favorites")
                                .required(false)
                                .help("Only favorites")
                                .action(clap::ArgAction::SetTrue),
                        )
                        .arg(
                            arg!(-l --"limit" <NUM>)
                                .required(false)
                                .help("Page size")
                                .value_parser(clap::value_parser!(usize))
                                .default_value("50"),
                        )
                        .arg(
                            arg!(-o --"offset" <NUM>)
                                .required(false)
                                .help("Rows to skip")
                                .value_parser(clap::value_parser!(usize))
                                .default_value("0"),
                        ),
                )
                .subcommand(
                    command!("favorite")
                        .about("Mark or unmark a captured request as favorite")
                        .arg(id_arg("The id of the captured request"))
                        .arg(
                            arg!(--"unset")
                                .required(false)
                                .help("Remove the favorite flag")
                                .action(clap::ArgAction::SetTrue),
                        ),
                )
                .subcommand(
                    command!("remove")
                        .about("Remove a captured request")
                        .arg(id_arg("The id of the captured request")),
                ),
        )
        .subcommand(
            command!("manual")
                .about("Manage manually curated sitemap entries")
                .subcommand_required(true)
                .subcommand(
                    command!("add")
                        .about("Add a manual sitemap entry")
                        .arg(target_arg())
                        .arg(
                            arg!(--"folder" <PATH>)
                                .required(true)
                                .help("The folder the entry belongs to, e.g. /api"),
                        )
                        .arg(
                            arg!(-m --"method" <METHOD>)
                                .required(false)
                                .help("HTTP method")
                                .default_value("GET"),
                        )
                        .arg(
                            arg!(-p --"path" <PATH>)
                                .required(true)
                                .help("The endpoint path, e.g. /api/users"),
                        )
                        .arg(arg!(-n --"notes" <TEXT>).required(false).help("Free-text notes"))
                        .arg(
                            arg!(--"log-id" <ID>)
                                .required(false)
                                .help("Captured request this entry was derived from")
                                .value_parser(clap::value_parser!(i64)),
                        ),
                )
                .subcommand(
                    command!("list")
                        .about("List manual sitemap entries")
                        .arg(target_arg()),
                )
                .subcommand(
                    command!("notes")
                        .about("Replace the notes of a manual entry")
                        .arg(id_arg("The id of the manual entry"))
                        .arg(
                            arg!([TEXT])
                                .required(false)
                                .help("New notes (omit to clear)"),
                        ),
                )
                .subcommand(
                    command!("remove")
                        .about("Remove a manual entry")
                        .arg(id_arg("The id of the manual entry")),
                ),
        )
        .subcommand(
            command!("page")
                .about("Manage recorded page sessions")
                .subcommand_required(true)
                .subcommand(
                    command!("start")
                        .about("Start recording a page session")
                        .arg(target_arg())
                        .arg(
                            arg!(-n --"name" <NAME>)
                                .required(true)
                                .help("The name of the page"),
                        )
                        .arg(
                            arg!(-d --"description" <TEXT>)
                                .required(false)
                                .help("What the session covers"),
                        ),
                )
                .subcommand(
                    command!("end")
                        .about("Stop recording a page session")
                        .arg(id_arg("The id of the page")),
                )
                .subcommand(
                    command!("list")
                        .about("List recorded pages")
                        .arg(target_arg()),
                ),
        )
        .subcommand(
            command!("sitemap")
                .about("Render the sitemap tree of a target")
                .arg(target_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
        .subcommand(
            command!("graph")
                .about("Export the node/edge graph of a target as JSON")
                .arg(target_arg())
                .arg(
                    arg!(--"pages")
                        .required(false)
                        .help("Project recorded pages instead of the sitemap")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save graph to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
