mod config;
mod handlers;

use crate::error::{CssError, Result};
use crate::{PseudoClasses, TransformRequest};
use clap::{Arg, ArgAction, Command};
use std::time::Instant;

lazy_static::lazy_static! {
    static ref LONG_VERSION: String = {
        let info = crate::build_info();
        format!("{}\nfeatures: {}", info.version, info.supported_features.join(", "))
    };
}

pub struct EnhancedCli {
    config: config::ConfigFile,
    start_time: Instant,
}

impl EnhancedCli {
    pub fn new() -> Self {
        Self {
            config: config::ConfigFile::default(),
            start_time: Instant::now(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        self.start_time = Instant::now();
        let matches = self.build_cli().get_matches();

        if let Some(config_path) = matches.get_one::<String>("config") {
            self.config = config::load(config_path)?;
        }

        self.setup_logging(matches.get_count("verbose"))?;

        let result = match matches.subcommand() {
            Some(("transform", sub_matches)) => handlers::handle_transform_command(self, sub_matches),
            Some(("targets", sub_matches)) => handlers::handle_targets_command(sub_matches),
            Some(("check", sub_matches)) => handlers::handle_check_command(sub_matches),
            _ => {
                println!("No subcommand specified. Use --help for usage information.");
                Ok(())
            }
        };
        log::debug!("Finished in {:?}", self.start_time.elapsed());
        result
    }

    fn build_cli(&self) -> Command {
        Command::new(crate::NAME)
            .version(crate::VERSION)
            .long_version(LONG_VERSION.as_str())
            .about(crate::DESCRIPTION)
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path (.json or .toml)")
                    .action(ArgAction::Set),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .long("verbose")
                    .help("Increase verbosity (can be used multiple times)")
                    .action(ArgAction::Count),
            )
            .subcommand(transform_args(
                Command::new("transform")
                    .about("Transform a CSS file for the given browser targets")
                    .arg(Arg::new("input").help("Input CSS file").required(true).index(1))
                    .arg(Arg::new("output").short('o').long("output").value_name("FILE").help("Output CSS file"))
                    .arg(Arg::new("exports").long("exports").value_name("FILE").help("Write CSS module exports, references and dependencies as JSON"))
                    .arg(Arg::new("stats").long("stats").help("Show detailed transformation statistics").action(ArgAction::SetTrue))
                    .arg(Arg::new("watch").short('w').long("watch").help("Watch for file changes and re-run").action(ArgAction::SetTrue)),
            ))
            .subcommand(
                Command::new("targets")
                    .about("Resolve a browserslist query and print the minimum versions")
                    .arg(Arg::new("query").help("browserslist query, e.g. \"last 2 versions, > 1%\"").required(true).index(1))
                    .arg(Arg::new("json").long("json").help("Print the targets as JSON").action(ArgAction::SetTrue)),
            )
            .subcommand(
                Command::new("check")
                    .about("Check CSS files for syntax errors")
                    .arg(Arg::new("input").help("Input CSS file or directory").required(true).index(1))
                    .arg(Arg::new("recursive").short('r').long("recursive").help("Check all CSS files in directory recursively").action(ArgAction::SetTrue)),
            )
    }

    fn setup_logging(&self, verbose_count: u8) -> Result<()> {
        let log_level = match verbose_count {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        env_logger::Builder::from_default_env()
            .filter_level(log_level)
            .format_timestamp_secs()
            .init();
        Ok(())
    }

    /// Flags first, then the config file, then the library defaults.
    pub fn build_request(&self, matches: &clap::ArgMatches) -> Result<TransformRequest> {
        let config = &self.config;
        let mut request = TransformRequest::default();

        let flag = |name: &str, configured: Option<bool>| matches.get_flag(name) || configured.unwrap_or(false);

        request.parser.nesting = flag("nesting", config.nesting);
        request.parser.custom_media = flag("custom-media", config.custom_media);
        request.parser.css_modules = flag("css-modules", config.css_modules);
        request.parser.css_modules_dashed_idents = flag("dashed-idents", config.dashed_idents);
        request.parser.error_recovery = flag("error-recovery", config.error_recovery);
        if let Some(pattern) = matches
            .get_one::<String>("pattern")
            .or(config.css_modules_pattern.as_ref())
        {
            request.parser.css_modules_pattern = pattern.clone();
            request.parser.css_modules = true;
        }

        if let Some(query) = matches.get_one::<String>("targets").or(config.targets.as_ref()) {
            request.transform.targets = crate::browserslist_to_targets(query)?;
        }
        if let Some(symbols) = matches.get_many::<String>("unused") {
            request.transform.unused_symbols.extend(symbols.cloned());
        }
        if let Some(symbols) = &config.unused_symbols {
            request.transform.unused_symbols.extend(symbols.iter().cloned());
        }
        request.transform.fail_on_unsupported = flag("fail-on-unsupported", config.fail_on_unsupported);

        request.printer.minify = flag("minify", config.minify);
        request.printer.source_map = flag("source-map", config.source_map);
        request.printer.analyze_dependencies = flag("analyze-dependencies", config.analyze_dependencies);
        if let Some(root) = matches.get_one::<String>("project-root").or(config.project_root.as_ref()) {
            request.printer.project_root = root.clone();
        }
        if let Some(map_path) = matches.get_one::<String>("input-source-map") {
            request.printer.input_source_map = std::fs::read_to_string(map_path).map_err(|e| CssError::FileNotFound {
                path: format!("{}: {}", map_path, e),
            })?;
            request.printer.source_map = true;
        }

        let configured = config.pseudo_classes.clone().unwrap_or_default();
        let pseudo = |name: &str, fallback: Option<String>| matches.get_one::<String>(name).cloned().or(fallback);
        request.printer.pseudo_classes = PseudoClasses {
            hover: pseudo("hover", configured.hover),
            active: pseudo("active", configured.active),
            focus: pseudo("focus", configured.focus),
            focus_visible: pseudo("focus-visible", configured.focus_visible),
            focus_within: pseudo("focus-within", configured.focus_within),
        };

        Ok(request)
    }

    pub fn output_directory(&self) -> Option<&str> {
        self.config.output_directory.as_deref()
    }
}

impl Default for EnhancedCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for the `transform` command.
fn transform_args(command: Command) -> Command {
    command
        .arg(Arg::new("targets").short('t').long("targets").value_name("QUERY").help("browserslist query to compile for"))
        .arg(Arg::new("minify").short('m').long("minify").help("Minify the output").action(ArgAction::SetTrue))
        .arg(Arg::new("nesting").long("nesting").help("Enable CSS nesting").action(ArgAction::SetTrue))
        .arg(Arg::new("custom-media").long("custom-media").help("Enable @custom-media rules").action(ArgAction::SetTrue))
        .arg(Arg::new("css-modules").long("css-modules").help("Compile as a CSS module").action(ArgAction::SetTrue))
        .arg(Arg::new("pattern").long("css-modules-pattern").value_name("PATTERN").help("CSS module naming pattern, e.g. \"[hash]_[local]\""))
        .arg(Arg::new("dashed-idents").long("css-modules-dashed-idents").help("Scope custom properties in CSS modules").action(ArgAction::SetTrue))
        .arg(Arg::new("error-recovery").long("error-recovery").help("Skip invalid rules and declarations instead of failing").action(ArgAction::SetTrue))
        .arg(Arg::new("unused").long("unused-symbol").value_name("NAME").help("Remove rules using this class, id, keyframes or custom property").action(ArgAction::Append))
        .arg(Arg::new("fail-on-unsupported").long("fail-on-unsupported").help("Fail when a feature is not supported by the targets").action(ArgAction::SetTrue))
        .arg(Arg::new("source-map").long("source-map").help("Write a source map next to the output").action(ArgAction::SetTrue))
        .arg(Arg::new("input-source-map").long("input-source-map").value_name("FILE").help("Source map of the input to chain through"))
        .arg(Arg::new("project-root").long("project-root").value_name("DIR").help("Root for source map paths and CSS module hashes"))
        .arg(Arg::new("analyze-dependencies").long("analyze-dependencies").help("Remove @import rules and replace url()s with placeholders").action(ArgAction::SetTrue))
        .arg(Arg::new("hover").long("hover-class").value_name("CLASS").help("Class to emit alongside :hover"))
        .arg(Arg::new("active").long("active-class").value_name("CLASS").help("Class to emit alongside :active"))
        .arg(Arg::new("focus").long("focus-class").value_name("CLASS").help("Class to emit alongside :focus"))
        .arg(Arg::new("focus-visible").long("focus-visible-class").value_name("CLASS").help("Class to emit alongside :focus-visible"))
        .arg(Arg::new("focus-within").long("focus-within-class").value_name("CLASS").help("Class to emit alongside :focus-within"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::Browser;

    fn request_for(cli: &EnhancedCli, args: &[&str]) -> TransformRequest {
        let matches = cli.build_cli().get_matches_from(args);
        let (_, sub_matches) = matches.subcommand().unwrap();
        cli.build_request(sub_matches).unwrap()
    }

    #[test]
    fn test_transform_flags() {
        let cli = EnhancedCli::new();
        let request = request_for(
            &cli,
            &[
                "flintcss", "transform", "in.css", "-t", "safari 13", "-m", "--nesting",
                "--css-modules-pattern", "[local]-[hash]", "--unused-symbol", "a",
                "--unused-symbol", "b", "--hover-class", "is-hovered",
            ],
        );
        assert!(request.printer.minify);
        assert!(request.parser.nesting);
        assert!(request.parser.css_modules);
        assert_eq!(request.parser.css_modules_pattern, "[local]-[hash]");
        assert_eq!(request.transform.unused_symbols.len(), 2);
        assert!(request.transform.targets.get(Browser::Safari).is_some());
        assert_eq!(request.printer.pseudo_classes.hover.as_deref(), Some("is-hovered"));
    }

    #[test]
    fn test_long_version_lists_features() {
        assert!(LONG_VERSION.starts_with(crate::VERSION));
        for feature in crate::build_info().supported_features {
            assert!(LONG_VERSION.contains(feature));
        }
        assert!(crate::supports_feature("source-maps"));
    }

    #[test]
    fn test_config_defaults_and_flag_override() {
        let mut cli = EnhancedCli::new();
        cli.config = config::ConfigFile {
            minify: Some(true),
            targets: Some("chrome 80".to_string()),
            pseudo_classes: Some(PseudoClasses {
                focus: Some("from-config".to_string()),
                ..PseudoClasses::default()
            }),
            ..config::ConfigFile::default()
        };

        let request = request_for(&cli, &["flintcss", "transform", "in.css", "-t", "firefox 70"]);
        assert!(request.printer.minify);
        assert!(request.transform.targets.get(Browser::Firefox).is_some());
        assert!(request.transform.targets.get(Browser::Chrome).is_none());
        assert_eq!(request.printer.pseudo_classes.focus.as_deref(), Some("from-config"));
    }
}
