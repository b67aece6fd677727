//! C3D CLI - Tool for inspecting and converting C3D motion capture files.

use std::env;
use std::path::Path;
use std::process::exit;

use c3d::prelude::{C3dReader, C3dWriter, ParamValue, PointEncoding};
use tracing_subscriber::EnvFilter;

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    // Split verbosity flags from positional args
    let mut level = "warn";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    match filtered_args[0] {
        // Info command - file summary
        "info" | "i" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: c3d info <file.c3d>");
                exit(1);
            }
            cmd_info(filtered_args[1]);
        }

        // Params command - full parameter directory
        "params" | "p" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: c3d params <file.c3d> [--json]");
                exit(1);
            }
            let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
            cmd_params(filtered_args[1], json_mode);
        }

        // Labels command - point labels in slot order
        "labels" | "l" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: c3d labels <file.c3d>");
                exit(1);
            }
            cmd_labels(filtered_args[1]);
        }

        // Dump command - frame coordinates
        "dump" | "d" => {
            if filtered_args.len() < 2 {
                eprintln!("Error: missing file argument");
                eprintln!("Usage: c3d dump <file.c3d> [--frames N]");
                exit(1);
            }
            let limit = parse_flag_value(&filtered_args, "--frames")
                .map(|s| match s.parse::<usize>() {
                    Ok(n) => n,
                    Err(_) => {
                        eprintln!("Error: --frames expects a number, got '{}'", s);
                        exit(1);
                    }
                });
            cmd_dump(filtered_args[1], limit);
        }

        // Copy command - re-encode a file, optionally switching point encoding
        "copy" | "c" => {
            if filtered_args.len() < 3 {
                eprintln!("Error: missing arguments");
                eprintln!("Usage: c3d copy <input.c3d> <output.c3d> [--float | --int <scale>]");
                exit(1);
            }
            let force_float = filtered_args.iter().any(|&s| s == "--float");
            let int_scale = parse_flag_value(&filtered_args, "--int").map(|s| {
                match s.parse::<f32>() {
                    Ok(v) if v >= 0.0 => v,
                    Ok(_) => {
                        eprintln!("Error: --int scale must be non-negative");
                        exit(1);
                    }
                    Err(_) => {
                        eprintln!("Error: --int expects a scale factor, got '{}'", s);
                        exit(1);
                    }
                }
            });
            if force_float && int_scale.is_some() {
                eprintln!("Error: --float and --int are mutually exclusive");
                exit(1);
            }
            cmd_copy(filtered_args[1], filtered_args[2], force_float, int_scale);
        }

        // Help
        "help" | "h" | "-h" | "--help" => print_help(),

        // A bare path is shorthand for the info command
        _ => {
            if Path::new(filtered_args[0]).exists() {
                cmd_info(filtered_args[0]);
            } else {
                eprintln!("Unknown command: {}", filtered_args[0]);
                eprintln!();
                print_help();
                exit(1);
            }
        }
    }
}

/// Value following a `--flag` argument, if the flag is present.
fn parse_flag_value<'a>(args: &[&'a str], flag: &str) -> Option<&'a str> {
    let pos = args.iter().position(|&s| s == flag)?;
    match args.get(pos + 1) {
        Some(v) => Some(v),
        None => {
            eprintln!("Error: {} expects a value", flag);
            exit(1);
        }
    }
}

fn print_help() {
    println!("c3d - C3D motion capture file toolkit");
    println!();
    println!("USAGE:");
    println!("    c3d [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <file>              Show header and directory summary");
    println!("    p, params <file> [--json]     List all parameter groups and values");
    println!("    l, labels <file>              List point labels in slot order");
    println!("    d, dump   <file> [--frames N] Print frame coordinates (first N frames)");
    println!("    c, copy   <in> <out>          Re-encode a file (--float / --int <scale>)");
    println!("    h, help                       Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (wire-level detail)");
    println!("    -q, --quiet      Errors only");
    println!();
    println!("EXAMPLES:");
    println!("    c3d info walk.c3d                     # Quick overview");
    println!("    c3d params walk.c3d --json            # Directory as JSON");
    println!("    c3d dump walk.c3d --frames 10         # First ten frames");
    println!("    c3d copy walk.c3d out.c3d --float     # Convert to float encoding");
    println!("    c3d copy walk.c3d out.c3d --int 0.1   # Quantize to int16 at 0.1mm");
    println!("    c3d -v info noisy.c3d                 # Verbose info");
    println!();
    println!("NOTES:");
    println!("    - Passing a .c3d file directly is equivalent to 'info'");
    println!("    - Log verbosity also honors the RUST_LOG environment variable");
}

fn open_reader(path: &str) -> C3dReader {
    match C3dReader::open(path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            exit(1);
        }
    }
}

fn cmd_info(path: &str) {
    let reader = open_reader(path);
    let header = reader.header();

    println!("File: {}", path);
    println!();
    println!("Points:    {}", reader.point_count());
    println!("Frames:    {}", reader.frame_count());
    println!("Rate:      {} Hz", reader.frame_rate());
    println!("Encoding:  {}", reader.encoding().name());
    if let PointEncoding::Integer { scale } = reader.encoding() {
        println!("Scale:     {}", scale);
    }
    if let Ok(units) = reader.parameter("POINT:UNITS").and_then(|p| p.value.as_str()) {
        println!("Units:     {}", units);
    }
    println!();
    println!("Header:");
    println!("  First sample:   {}", header.first_sample());
    println!("  Last sample:    {}", header.last_sample());
    println!("  Data start:     block {}", header.data_start());
    println!("  Analog:         {} channels", header.analog_channels());
    println!("  Event labels:   {}", if header.event_labels() { "4-char" } else { "2-char" });
    println!();

    let groups = reader.directory().groups();
    let params: usize = groups.iter().map(|g| g.params.len()).sum();
    println!("Directory: {} groups, {} parameters", groups.len(), params);
    for g in groups {
        println!("  {:<12} {} parameters", g.name, g.params.len());
    }
}

fn cmd_params(path: &str, json_mode: bool) {
    let reader = open_reader(path);

    if json_mode {
        let groups: Vec<serde_json::Value> = reader
            .directory()
            .groups()
            .iter()
            .map(|g| {
                let params: Vec<serde_json::Value> = g
                    .params
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "name": p.name,
                            "description": p.description,
                            "locked": p.locked,
                            "type": p.value.param_type().name(),
                            "dimensions": p.value.dimensions().sizes(),
                            "value": value_to_json(&p.value),
                        })
                    })
                    .collect();
                serde_json::json!({
                    "name": g.name,
                    "id": g.id,
                    "description": g.description,
                    "parameters": params,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "file": path,
                "groups": groups
            }))
            .unwrap_or_default()
        );
        return;
    }

    println!("File: {}", path);
    for g in reader.directory().groups() {
        println!();
        if g.description.is_empty() {
            println!("{} (id {})", g.name, g.id);
        } else {
            println!("{} (id {}) - {}", g.name, g.id, g.description);
        }
        for p in &g.params {
            let lock = if p.locked { " [locked]" } else { "" };
            println!(
                "  {:<16} {:<8} {:<9} {}{}",
                p.name,
                p.value.param_type().name(),
                p.value.dimensions().to_string(),
                format_value(&p.value),
                lock
            );
        }
    }
}

fn cmd_labels(path: &str) {
    let reader = open_reader(path);
    for (i, label) in reader.labels().iter().enumerate() {
        println!("[{:>3}] {}", i, label);
    }
}

fn cmd_dump(path: &str, limit: Option<usize>) {
    let mut reader = open_reader(path);
    let labels = reader.labels().to_vec();
    let total = limit.unwrap_or(reader.frame_count()).min(reader.frame_count());

    for n in 0..total {
        let frame = match reader.read_frame() {
            Ok(Some(f)) => f,
            Ok(None) => {
                eprintln!("File ended after {} of {} frames", n, total);
                break;
            }
            Err(e) => {
                eprintln!("Failed to read frame {}: {}", n + 1, e);
                exit(1);
            }
        };
        println!("Frame {}:", n + 1);
        for (i, point) in frame.points().iter().enumerate() {
            let label = labels.get(i).map(String::as_str).unwrap_or("");
            match point {
                Some(p) => println!(
                    "  [{:>3}] {:<16} ({:>10.3}, {:>10.3}, {:>10.3})",
                    i, label, p.x, p.y, p.z
                ),
                None => println!("  [{:>3}] {:<16} unobserved", i, label),
            }
        }
    }
}

fn cmd_copy(input: &str, output: &str, force_float: bool, int_scale: Option<f32>) {
    let mut reader = open_reader(input);
    let mut writer = C3dWriter::new();

    // Carry the whole directory over, descriptions included.
    for g in reader.directory().groups() {
        if let Err(e) = writer.set_group_description(&g.name, &g.description) {
            eprintln!("Failed to copy group {}: {}", g.name, e);
            exit(1);
        }
        for p in &g.params {
            let path = format!("{}:{}", g.name, p.name);
            if let Err(e) = writer.set_parameter(&path, p.value.clone()) {
                eprintln!("Failed to copy parameter {}: {}", path, e);
                exit(1);
            }
            if !p.description.is_empty() {
                if let Err(e) = writer.set_parameter_description(&path, &p.description) {
                    eprintln!("Failed to copy parameter {}: {}", path, e);
                    exit(1);
                }
            }
        }
    }

    // The reader's label list is the reconciled one; re-set it so
    // POINT:LABELS and POINT:USED agree even if the input was sloppy.
    let labels = reader.labels().to_vec();
    if let Err(e) = writer.set_labels(&labels) {
        eprintln!("Failed to copy labels: {}", e);
        exit(1);
    }

    let out_encoding = if force_float {
        PointEncoding::Float
    } else if let Some(scale) = int_scale {
        PointEncoding::Integer { scale }
    } else {
        reader.encoding()
    };
    let scale_value = match out_encoding {
        PointEncoding::Integer { scale } => scale,
        PointEncoding::Float => -1.0,
    };
    if let Err(e) = writer.set_scale(scale_value) {
        eprintln!("Failed to set scale: {}", e);
        exit(1);
    }

    if let Err(e) = writer.open(output) {
        eprintln!("Failed to create {}: {}", output, e);
        exit(1);
    }

    loop {
        match reader.read_frame() {
            Ok(Some(frame)) => {
                let res = match out_encoding {
                    PointEncoding::Float => writer.write_float_frame(frame.points()),
                    PointEncoding::Integer { .. } => writer.write_int_frame(frame.points()),
                };
                if let Err(e) = res {
                    eprintln!("Failed to write frame: {}", e);
                    exit(1);
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read frame: {}", e);
                exit(1);
            }
        }
    }

    let frames = writer.frames_written();
    if let Err(e) = writer.close() {
        eprintln!("Failed to finalize {}: {}", output, e);
        exit(1);
    }
    println!(
        "Copied {} -> {} ({} frames, {})",
        input,
        output,
        frames,
        out_encoding.name()
    );
}

fn format_value(value: &ParamValue) -> String {
    const MAX_SHOWN: usize = 8;
    fn list<T: std::fmt::Display>(items: &[T]) -> String {
        let shown: Vec<String> = items.iter().take(MAX_SHOWN).map(|v| v.to_string()).collect();
        if items.len() > MAX_SHOWN {
            format!("[{}, ... {} total]", shown.join(", "), items.len())
        } else {
            format!("[{}]", shown.join(", "))
        }
    }

    match value {
        ParamValue::Char(c) => format!("{:?}", c),
        ParamValue::Str(s) => format!("{:?}", s),
        ParamValue::StrArray { values, .. } => {
            let shown: Vec<String> = values
                .iter()
                .take(MAX_SHOWN)
                .map(|v| format!("{:?}", v))
                .collect();
            if values.len() > MAX_SHOWN {
                format!("[{}, ... {} total]", shown.join(", "), values.len())
            } else {
                format!("[{}]", shown.join(", "))
            }
        }
        ParamValue::Byte(v) => v.to_string(),
        ParamValue::ByteArray(v) => list(v),
        ParamValue::Int16(v) => v.to_string(),
        ParamValue::Int16Array(v) => list(v),
        ParamValue::Float32(v) => v.to_string(),
        ParamValue::Float32Array(v) => list(v),
    }
}

fn value_to_json(value: &ParamValue) -> serde_json::Value {
    match value {
        ParamValue::Char(c) => serde_json::json!(c.to_string()),
        ParamValue::Str(s) => serde_json::json!(s),
        ParamValue::StrArray { values, .. } => serde_json::json!(values),
        ParamValue::Byte(v) => serde_json::json!(v),
        ParamValue::ByteArray(v) => serde_json::json!(v),
        ParamValue::Int16(v) => serde_json::json!(v),
        ParamValue::Int16Array(v) => serde_json::json!(v),
        ParamValue::Float32(v) => serde_json::json!(v),
        ParamValue::Float32Array(v) => serde_json::json!(v),
    }
}
