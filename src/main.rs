//! TV head CLI - convert image folders and simulate the device.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tvhead::{
    control::{ParameterSink, SerialLinkTask, parameters},
    pipeline::Converter,
    playback::{AnimationSource, Clock, DirectoryLibrary, ManualClock, MemoryDriver, PlaybackEngine, Scheduler},
    schema::{ConverterConfig, DeviceConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--example") => print_example_config(),
        Some("convert") if args.len() >= 4 => run_convert(&args[2..]),
        Some("play") if args.len() >= 3 => run_play(&args[2..]),
        _ => {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} convert <images_root> <output_root> [config.json]", program);
    eprintln!("  {} play <device_root> [ticks] [config.json] [serial_capture]", program);
    eprintln!("  {} --example", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  convert  Encode every image folder into a device animation");
    eprintln!("  play     Run the playback engine against a simulated strip");
    eprintln!();
    eprintln!("Example configurations are printed with --example.");
}

/// Load a JSON config, or the default when no path is given.
fn load_config<T: DeserializeOwned + Default>(path: Option<&String>) -> T {
    let Some(path) = path else {
        return T::default();
    };
    let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });
    serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    })
}

fn run_convert(args: &[String]) {
    let images_root = PathBuf::from(&args[0]);
    let output_root = PathBuf::from(&args[1]);
    let config: ConverterConfig = load_config(args.get(2));

    println!("TV Head Converter");
    println!("=================");
    println!(
        "Display: {}x{} (rotation {:?}, flip {:?})",
        config.display.width, config.display.height, config.display.rotation, config.display.flip
    );
    println!("Compression: {:?}", config.compression);
    println!("Input: {}", images_root.display());
    println!("Output: {}", output_root.display());
    println!();

    let converter = Converter::new(config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let report = converter
        .convert_all(&images_root, &output_root)
        .unwrap_or_else(|e| {
            eprintln!("Conversion failed: {}", e);
            std::process::exit(1);
        });

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(converted) => println!(
                "  {}: {} frames, {} changes -> {}",
                outcome.label,
                converted.stats.frame_count,
                converted.stats.entries,
                converted.binary.display()
            ),
            Err(e) => println!("  {}: FAILED ({})", outcome.label, e),
        }
    }
    println!();
    println!("{}", report);
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());

    if report.succeeded == 0 {
        std::process::exit(1);
    }
}

fn run_play(args: &[String]) {
    let device_root = Path::new(&args[0]);
    let ticks: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1000);
    let config: DeviceConfig = load_config(args.get(2));

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    let library = DirectoryLibrary::scan(device_root).unwrap_or_else(|e| {
        eprintln!("Error scanning {}: {}", device_root.display(), e);
        std::process::exit(1);
    });
    let channel_count = library.channel_count();

    println!("TV Head Playback (simulated)");
    println!("============================");
    println!("Library: {}", device_root.display());
    println!("Channels: {}", channel_count);
    for (i, name) in library.channel_names().enumerate() {
        println!("  [{}] {}", i, name);
    }
    println!("Ticks: {}", ticks);
    println!();

    let (writer, reader) = parameters(config.initial);
    let mut engine = PlaybackEngine::new(
        MemoryDriver::with_history(1),
        library,
        reader.clone(),
        &config.display,
        config.playback,
    );

    // A recorded serial capture stands in for the knob board.
    let mut link = args.get(3).map(|path| {
        let port = File::open(path).unwrap_or_else(|e| {
            eprintln!("Error opening serial capture: {}", e);
            std::process::exit(1);
        });
        let sink = ParameterSink::new(writer, config.control.clone(), channel_count);
        SerialLinkTask::new(port, sink, &config.control)
    });

    let start = Instant::now();
    let mut scheduler = Scheduler::new(ManualClock::new());
    scheduler.add(&mut engine);
    if let Some(link) = link.as_mut() {
        scheduler.add(link);
    }
    scheduler.run(ticks);
    let simulated: Duration = scheduler.clock().now();
    drop(scheduler);

    let params = reader.snapshot();
    println!("State: {:?}", engine.state());
    println!(
        "Channel: {:?} ({})",
        engine.current_channel(),
        engine
            .current_channel()
            .and_then(|c| engine.library().channel_name(c))
            .unwrap_or("-")
    );
    println!("Frame: {}", engine.frame_index());
    println!(
        "Parameters: brightness={:.2}, speed={:.2}, channel={}",
        params.brightness, params.speed, params.channel
    );
    println!("Frames committed: {}", engine.driver().commit_count());
    if let Some(last) = engine.driver().last() {
        let lit = last.iter().filter(|c| c.r > 0 || c.g > 0 || c.b > 0).count();
        println!("Lit LEDs: {}/{}", lit, last.len());
    }
    println!(
        "Simulated: {:.2}s in {:.3}s wall time",
        simulated.as_secs_f32(),
        start.elapsed().as_secs_f32()
    );
}

fn print_example_config() {
    let converter = serde_json::to_string_pretty(&ConverterConfig::default());
    let device = serde_json::to_string_pretty(&DeviceConfig::default());

    match (converter, device) {
        (Ok(converter), Ok(device)) => {
            println!("Example converter configuration (convert.json):");
            println!("{}", converter);
            println!();
            println!("Example device configuration (device.json):");
            println!("{}", device);
        }
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
