//! mng-cli - Tool for inspecting and playing MNG, PNG and JNG files.

use std::env;
use std::process::exit;

use mng::chunk::{ChunkRecord, Payload, Value};
use mng::core::{DecoderOptions, MmapSource, NoCallbacks};
use mng::{Mng, Status};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut verbosity = 0u8;
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = verbosity.max(1),
            "-vv" | "--trace" => verbosity = 2,
            _ => filtered_args.push(arg),
        }
    }
    init_logging(verbosity);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let file = |usage: &str| file_arg(&filtered_args, usage);

    match filtered_args[0] {
        "info" | "i" => cmd_info(file("mng-cli info <file>")),
        "chunks" | "c" => {
            let json = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
            cmd_chunks(file("mng-cli chunks <file> [--json]"), json);
        }
        "play" | "p" => {
            let path = file("mng-cli play <file> --frame N");
            let frame = match flag_value(&filtered_args, "--frame") {
                Some(v) => match v.parse::<u32>() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        eprintln!("Error: --frame expects a number, got '{v}'");
                        exit(1);
                    }
                },
                None => None,
            };
            cmd_play(path, frame);
        }
        "help" | "h" | "-h" | "--help" => print_help(),
        other if other.ends_with(".mng") || other.ends_with(".png") || other.ends_with(".jng") => cmd_info(other),
        other => {
            eprintln!("Unknown command: {other}");
            print_help();
            exit(1);
        }
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "mng=debug",
        _ => "mng=trace",
    };
    let filter = if verbosity == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    } else {
        EnvFilter::new(default)
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn file_arg<'a>(args: &[&'a str], usage: &str) -> &'a str {
    match args.get(1) {
        Some(&f) => f,
        None => {
            eprintln!("Error: missing file argument");
            eprintln!("Usage: {usage}");
            exit(1);
        }
    }
}

fn flag_value<'a>(args: &[&'a str], flag: &str) -> Option<&'a str> {
    let at = args.iter().position(|&a| a == flag)?;
    args.get(at + 1).copied()
}

fn print_help() {
    println!("mng-cli - MNG/JNG/PNG toolkit (built {})", env!("MNG_BUILD_DATE"));
    println!();
    println!("USAGE:");
    println!("    mng-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>                Show header, chunk counts and totals");
    println!("    c, chunks <file> [--json]       Dump decoded chunks");
    println!("    p, play   <file> [--frame N]    Replay to a frame and print the canvas checksum");
    println!("    h, help                         Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!();
    println!("EXAMPLES:");
    println!("    mng-cli info spinner.mng");
    println!("    mng-cli chunks spinner.mng --json");
    println!("    mng-cli play spinner.mng --frame 3");
    println!();
    println!("NOTES:");
    println!("    - Passing a file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the log filter when no -v flag is given");
}

fn open(path: &str, opts: DecoderOptions) -> Mng<MmapSource> {
    let source = match MmapSource::open(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error opening {path}: {e}");
            exit(1);
        }
    };
    let mut mng = Mng::with_options(source, opts);
    match mng.read(&mut NoCallbacks) {
        Ok(Status::Done) => {}
        Ok(status) => {
            eprintln!("Error reading {path}: stream incomplete ({status:?})");
            exit(1);
        }
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            exit(1);
        }
    }
    mng
}

fn cmd_info(path: &str) {
    let mng = open(path, DecoderOptions::default());

    println!("File: {path}");
    if let Some(sig) = mng.signature() {
        println!("Type: {sig:?}");
    }
    if let Some(info) = mng.info() {
        println!("Size: {}x{}", info.width, info.height);
        if info.ticks > 0 {
            println!("Ticks/s: {}", info.ticks);
            println!(
                "Declared: {} layers, {} frames, {} ticks play time",
                info.layer_count, info.frame_count, info.play_time
            );
            println!("Simplicity: 0x{:08x}", info.simplicity);
        }
    }
    if let Some(t) = mng.totals() {
        println!("Frames: {}", t.frames);
        println!("Layers: {}", t.layers);
        println!("Play time: {} ms", t.play_time);
    }
    println!("Records: {}", mng.log().len());
    println!();
    println!("Chunks:");
    for (id, count) in mng.chunk_counts() {
        println!("    {id}  {count:>6}");
    }
    let warnings = mng.warnings();
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for w in warnings {
            println!("    {w}");
        }
    }
}

fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(v) => serde_json::json!(v),
        Value::Flag(b) => serde_json::json!(b),
        Value::Text { bytes, .. } => serde_json::json!(String::from_utf8_lossy(bytes)),
        Value::Deflated { inflated, .. } => serde_json::json!(String::from_utf8_lossy(inflated)),
        Value::Raw(bytes) => serde_json::json!({ "len": bytes.len() }),
    }
}

fn chunk_json(rec: &ChunkRecord) -> serde_json::Value {
    let fields: serde_json::Map<String, serde_json::Value> =
        rec.fields.iter().map(|(name, v)| (name.to_string(), value_json(v))).collect();
    serde_json::json!({
        "id": rec.id.to_string(),
        "seq": rec.seq,
        "empty": rec.empty,
        "fields": fields,
        "payload": payload_name(&rec.payload),
    })
}

fn payload_name(payload: &Payload) -> Option<String> {
    match payload {
        Payload::None => None,
        other => {
            let text = format!("{other:?}");
            let name = text.split(['(', ' ', '{']).next().unwrap_or_default();
            Some(name.to_string())
        }
    }
}

fn cmd_chunks(path: &str, json: bool) {
    let mng = open(path, DecoderOptions::default().with_store_chunks(true));
    let chunks = mng.chunks();

    if json {
        let list: Vec<serde_json::Value> = chunks.iter().map(chunk_json).collect();
        match serde_json::to_string_pretty(&serde_json::json!({ "file": path, "chunks": list })) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error: {e}");
                exit(1);
            }
        }
        return;
    }

    for rec in chunks {
        let fields: Vec<String> = rec
            .fields
            .iter()
            .map(|(name, v)| format!("{name}={}", value_json(v)))
            .collect();
        let payload = payload_name(&rec.payload).map(|p| format!(" [{p}]")).unwrap_or_default();
        println!("{:>5}  {}  {}{}", rec.seq, rec.id, fields.join(" "), payload);
    }
}

fn cmd_play(path: &str, frame: Option<u32>) {
    let mut mng = open(path, DecoderOptions::default());
    let mut cb = NoCallbacks;

    // Without a frame: the last frame of the first pass.
    let last = mng.totals().map_or(0, |t| t.frames.saturating_sub(1));
    let result = mng.goto_frame(frame.unwrap_or(last), &mut cb);
    if let Err(e) = result {
        eprintln!("Error playing {path}: {e}");
        exit(1);
    }
    if let Some(engine) = mng.engine() {
        let ctx = &engine.ctx;
        println!("Frame: {}  Layer: {}  Time: {} ms", ctx.frame, ctx.layer, ctx.time);
    }
    match mng.checksum() {
        Some(sum) => println!("Checksum: {sum:08x}"),
        None => println!("Checksum: none"),
    }
}
