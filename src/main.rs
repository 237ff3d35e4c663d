use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use chordsheet::shapes::{diagrams_for, frets_string, ChordLibrary};
use chordsheet::sync::line_at_time;
use chordsheet::{
    build_catalog_dir, facets, load_catalog, parse_song_document, render::render_line, search,
    to_markdown, Config, DisplayMode, FilterCriteria, FuzzySearch, RenderOptions, SongContent,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: chordsheet [--config <file.yaml>] <command> [args]

Commands:
  build <dir> [out.json]     Build a catalog from the .md songs under <dir>
  show <id|file.md>          Print a song
      [--transpose N] [--capo N] [--mode combined|chords|lyrics]
      [--flats | --sharps] [--diagrams] [--at SECONDS]
  search [query]             Search the catalog
      [--artist A] [--key K] [--capo N] [--tag T]...
  facets                     List artists, keys, capos and tags
  add <file.md>              Save a song document to the local overlay
  export <id> [out.md]       Write a song back out as a document";

type CliResult = Result<(), Box<dyn Error>>;

/// Positional arguments plus `--name value` options and `--switch` flags
struct Args {
    positional: Vec<String>,
    values: Vec<(String, String)>,
    switches: Vec<String>,
}

impl Args {
    fn parse(raw: &[String], value_flags: &[&str], switch_flags: &[&str]) -> Result<Self, String> {
        let mut args = Args {
            positional: Vec::new(),
            values: Vec::new(),
            switches: Vec::new(),
        };
        let mut iter = raw.iter();
        while let Some(arg) = iter.next() {
            if value_flags.contains(&arg.as_str()) {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{} needs a value", arg))?;
                args.values.push((arg.clone(), value.clone()));
            } else if switch_flags.contains(&arg.as_str()) {
                args.switches.push(arg.clone());
            } else if arg.starts_with("--") {
                return Err(format!("unknown option '{}'", arg));
            } else {
                args.positional.push(arg.clone());
            }
        }
        Ok(args)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|(flag, _)| flag == name)
            .map(|(_, value)| value.as_str())
    }

    fn all(&self, name: &str) -> Vec<String> {
        self.values
            .iter()
            .filter(|(flag, _)| flag == name)
            .map(|(_, value)| value.clone())
            .collect()
    }

    fn has(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    fn number<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, String> {
        self.value(name)
            .map(|v| v.parse().map_err(|_| format!("{} expects a number, got '{}'", name, v)))
            .transpose()
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut config_path: Option<PathBuf> = None;
    if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
        config_path = Some(PathBuf::from(args.remove(1)));
        args.remove(0);
    }

    if args.is_empty() {
        eprintln!("{}", USAGE);
        process::exit(1);
    }
    let command = args.remove(0);

    let config = match Config::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match command.as_str() {
        "build" => cmd_build(&args),
        "show" => cmd_show(&config, &args),
        "search" => cmd_search(&config, &args),
        "facets" => cmd_facets(&config),
        "add" => cmd_add(&config, &args),
        "export" => cmd_export(&config, &args),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => Err(format!("unknown command '{}'\n\n{}", other, USAGE).into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn cmd_build(raw: &[String]) -> CliResult {
    let args = Args::parse(raw, &[], &[])?;
    let Some(dir) = args.positional.first() else {
        return Err("Usage: chordsheet build <dir> [out.json]".into());
    };

    let catalog = build_catalog_dir(Path::new(dir))?;
    let json = catalog.to_json_pretty()?;

    match args.positional.get(1) {
        Some(path) => {
            fs::write(path, &json).map_err(|e| format!("Error writing to '{}': {}", path, e))?;
            eprintln!("Wrote {} songs to {}", catalog.songs.len(), path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// A song from a document path, or by id from the catalog
fn find_song(config: &Config, target: &str) -> Result<SongContent, Box<dyn Error>> {
    let path = Path::new(target);
    if path.is_file() {
        let source = fs::read_to_string(path)
            .map_err(|e| format!("Error reading file '{}': {}", target, e))?;
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned());
        return Ok(parse_song_document(&source, stem.as_deref())?);
    }

    let catalog = load_catalog(config)?;
    catalog
        .song(target)
        .cloned()
        .ok_or_else(|| format!("no song with id '{}'", target).into())
}

fn cmd_show(config: &Config, raw: &[String]) -> CliResult {
    let args = Args::parse(
        raw,
        &["--transpose", "--capo", "--mode", "--at"],
        &["--flats", "--sharps", "--diagrams"],
    )?;
    let Some(target) = args.positional.first() else {
        return Err("Usage: chordsheet show <id|file.md> [options]".into());
    };

    let mode = match args.value("--mode") {
        Some(mode) => mode.parse::<DisplayMode>()?,
        None => DisplayMode::default(),
    };
    let prefer_flats = match (args.has("--flats"), args.has("--sharps")) {
        (true, true) => return Err("--flats and --sharps are exclusive".into()),
        (true, false) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    };
    let opts = RenderOptions {
        mode,
        transpose: args.number("--transpose")?.unwrap_or(0),
        capo: args.number("--capo")?.unwrap_or(0),
        prefer_flats,
    };

    let song = find_song(config, target)?;
    let fm = &song.frontmatter;
    println!("{} - {}", fm.title, fm.artist);
    println!("Key: {}  Capo: {}", fm.key, fm.capo);
    println!();

    let current = match args.number::<f64>("--at")? {
        Some(time) => fm
            .scroll_map
            .as_deref()
            .and_then(|map| line_at_time(map, time)),
        None => None,
    };
    let line_opts = opts.for_key(&fm.key);
    for (index, line) in song.ast.iter().enumerate() {
        let marker = if current == Some(index) { "> " } else { "" };
        println!("{}{}", marker, render_line(line, &line_opts));
    }

    if args.has("--diagrams") {
        println!();
        for diagram in diagrams_for(&song, &ChordLibrary::builtin(), &opts) {
            match &diagram.shape {
                Some(shape) => println!("{:<10} {}", diagram.displayed, frets_string(shape)),
                None => println!("{:<10} (no diagram)", diagram.displayed),
            }
        }
    }
    Ok(())
}

fn cmd_search(config: &Config, raw: &[String]) -> CliResult {
    let args = Args::parse(raw, &["--artist", "--key", "--capo", "--tag"], &[])?;
    let tags = args.all("--tag");
    let criteria = FilterCriteria {
        artist: args.value("--artist").map(str::to_string),
        key: args.value("--key").map(str::to_string),
        capo: args.number("--capo")?,
        tags: (!tags.is_empty()).then_some(tags),
    };
    let query = args.positional.join(" ");

    let catalog = load_catalog(config)?;
    let hits = search(&catalog.entries, &query, &FuzzySearch::default(), &criteria);
    for entry in &hits {
        println!(
            "{}\t{}\t{}\t{}\tcapo {}",
            entry.id, entry.title, entry.artist, entry.key, entry.capo
        );
    }
    eprintln!("{} of {} songs", hits.len(), catalog.entries.len());
    Ok(())
}

fn cmd_facets(config: &Config) -> CliResult {
    let catalog = load_catalog(config)?;
    let facets = facets(&catalog.entries);
    println!("artists: {}", facets.artists.join(", "));
    println!("keys:    {}", facets.keys.join(", "));
    let capos: Vec<String> = facets.capos.iter().map(u32::to_string).collect();
    println!("capos:   {}", capos.join(", "));
    println!("tags:    {}", facets.tags.join(", "));
    Ok(())
}

fn cmd_add(config: &Config, raw: &[String]) -> CliResult {
    let args = Args::parse(raw, &[], &[])?;
    let Some(path) = args.positional.first() else {
        return Err("Usage: chordsheet add <file.md>".into());
    };
    let source = fs::read_to_string(path).map_err(|e| format!("Error reading file '{}': {}", path, e))?;
    let song = parse_song_document(&source, None)?;
    let id = song.frontmatter.id.clone();

    let store = config.overlay_store();
    let mut overlay = store.load();
    overlay.upsert_song(song);
    store.save(&overlay)?;

    eprintln!("Saved '{}' to {}", id, config.overlay_path().display());
    println!("{}", id);
    Ok(())
}

fn cmd_export(config: &Config, raw: &[String]) -> CliResult {
    let args = Args::parse(raw, &[], &[])?;
    let Some(id) = args.positional.first() else {
        return Err("Usage: chordsheet export <id> [out.md]".into());
    };
    let song = find_song(config, id)?;
    let markdown = to_markdown(&song)?;

    match args.positional.get(1) {
        Some(path) => {
            fs::write(path, &markdown).map_err(|e| format!("Error writing to '{}': {}", path, e))?;
            eprintln!("Wrote {} to {}", song.frontmatter.id, path);
        }
        None => print!("{}", markdown),
    }
    Ok(())
}
