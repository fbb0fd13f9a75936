use toc_modder::context::parse_id;
use toc_modder::toc::index::AssetKind;
use toc_modder::toc::stream_path;
use toc_modder::{Archive, SessionContext, WorkingSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use anyhow::{Result, Context, anyhow};
use log::{info, error, warn};
use rayon::prelude::*;

fn print_usage() {
    println!("\nUsage: toc-modder <command> [args]");
    println!("\nCommands:");
    println!("  info            Summarize the contents of an archive");
    println!("  roundtrip       Decode and re-encode an archive into a folder");
    println!("  combine         Load archives, import patches and write one combined patch");
    println!("  extract-audio   Write the payload of one audio source to a file");
    println!("  replace-audio   Replace one audio source and write a patch");
    println!("  scan            Decode every archive below a folder and report failures");
    println!("\nRun 'toc-modder <command> --help' for specific usage info.");
    println!("\nEnvironment:");
    println!("  {}   language id of the text banks to show (decimal or 0x hex)", SessionContext::LANGUAGE_VAR);
    println!("  {}      set to 1 for debug logging", SessionContext::DEBUG_VAR);
}

fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help" || a == "-h")
}

fn usage_error(usage: &str, cmd: &str) -> anyhow::Error {
    anyhow!("Usage: toc-modder {usage}\nTry 'toc-modder {cmd} --help' for more information.")
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let ctx = SessionContext::from_env();
    let default_filter = if ctx.debug { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::default().default_filter_or(default_filter));

    let Some(cmd) = args.get(1).map(|s| s.as_str()) else {
        print_usage();
        return Ok(());
    };

    match cmd {
        "info" => {
            if wants_help(&args) {
                println!("Usage: toc-modder info <archive>");
                println!("\nPrints the banks, streams, text banks and videos of an archive.");
                println!("\nExample:");
                println!("  toc-modder info ./data/2e24ba9dd702da5c");
                return Ok(());
            }
            if args.len() < 3 {
                return Err(usage_error("info <archive>", cmd));
            }
            run_info(Path::new(&args[2]), &ctx)?;
        }
        "roundtrip" => {
            if wants_help(&args) {
                println!("Usage: toc-modder roundtrip <archive> <out_dir>");
                println!("\nDecodes the archive, writes it back into <out_dir> and reports whether the bytes match.");
                println!("\nExample:");
                println!("  toc-modder roundtrip ./data/2e24ba9dd702da5c ./out");
                return Ok(());
            }
            if args.len() < 4 {
                return Err(usage_error("roundtrip <archive> <out_dir>", cmd));
            }
            run_roundtrip(Path::new(&args[2]), Path::new(&args[3]))?;
        }
        "combine" => {
            if wants_help(&args) {
                println!("Usage: toc-modder combine <out_dir> <archive>... --patch <patch>...");
                println!("\nLoads the archives, imports every patch in order and writes a single combined patch.");
                println!("\nExample:");
                println!("  toc-modder combine ./out ./data/2e24ba9dd702da5c --patch ./mods/a.patch_0 ./mods/b.patch_0");
                return Ok(());
            }
            let usage = "combine <out_dir> <archive>... --patch <patch>...";
            if args.len() < 5 {
                return Err(usage_error(usage, cmd));
            }
            let rest = &args[3..];
            let split = rest
                .iter()
                .position(|a| a == "--patch")
                .ok_or_else(|| usage_error(usage, cmd))?;
            let archives: Vec<PathBuf> = rest[..split].iter().map(PathBuf::from).collect();
            let patches: Vec<PathBuf> = rest[split + 1..].iter().map(PathBuf::from).collect();
            if archives.is_empty() || patches.is_empty() {
                return Err(usage_error(usage, cmd));
            }
            run_combine(Path::new(&args[2]), &archives, &patches)?;
        }
        "extract-audio" => {
            if wants_help(&args) {
                println!("Usage: toc-modder extract-audio <archive> <source_id> <out_file>");
                println!("\nWrites the raw payload of an audio source (embedded, prefetch or streamed).");
                println!("\nExample:");
                println!("  toc-modder extract-audio ./data/2e24ba9dd702da5c 123456789 ./voice.wem");
                return Ok(());
            }
            if args.len() < 5 {
                return Err(usage_error("extract-audio <archive> <source_id> <out_file>", cmd));
            }
            let id = parse_id(&args[3]).ok_or_else(|| anyhow!("Invalid source id: {}", args[3]))?;
            run_extract_audio(Path::new(&args[2]), id, Path::new(&args[4]))?;
        }
        "replace-audio" => {
            if wants_help(&args) {
                println!("Usage: toc-modder replace-audio <archive> <source_id> <payload> <out_dir>");
                println!("\nReplaces an audio source with the given payload and writes a patch into <out_dir>.");
                println!("Music track clip durations are updated from the payload header.");
                println!("\nExample:");
                println!("  toc-modder replace-audio ./data/2e24ba9dd702da5c 123456789 ./new.wem ./out");
                return Ok(());
            }
            if args.len() < 6 {
                return Err(usage_error("replace-audio <archive> <source_id> <payload> <out_dir>", cmd));
            }
            let id = parse_id(&args[3]).ok_or_else(|| anyhow!("Invalid source id: {}", args[3]))?;
            run_replace_audio(Path::new(&args[2]), id, Path::new(&args[4]), Path::new(&args[5]))?;
        }
        "scan" => {
            if wants_help(&args) {
                println!("Usage: toc-modder scan <folder>");
                println!("\nDecodes every archive found below <folder> in parallel and prints a summary.");
                println!("\nExample:");
                println!("  toc-modder scan ./data");
                return Ok(());
            }
            if args.len() < 3 {
                return Err(usage_error("scan <folder>", cmd));
            }
            run_scan(Path::new(&args[2]))?;
        }
        "--help" | "-h" | "help" => print_usage(),
        other => {
            print_usage();
            return Err(anyhow!("Unknown command: {other}"));
        }
    }

    Ok(())
}

fn run_info(path: &Path, ctx: &SessionContext) -> Result<()> {
    let archive = Archive::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let store = &archive.store;

    println!("Archive: {}", archive.name);
    println!("  streams:      {}", store.streams.len());
    println!("  banks:        {}", store.banks.len());
    println!("  dependencies: {}", store.dependencies.len());
    println!("  text banks:   {}", store.text_banks.len());
    println!("  videos:       {}", store.videos.len());
    println!("  entries:      {}", store.hierarchy.len());
    println!("  audio:        {}", store.audio.len());

    for bank in store.banks.values() {
        println!(
            "\nBank {:#018x} (id {}, revision {}, {} entries, {} embedded media)",
            bank.file_id(),
            bank.bank_id,
            bank.version.raw(),
            bank.hierarchy.len(),
            bank.media.len()
        );
        if let Some(path) = &bank.dependency_path {
            println!("  path: {path}");
        }
    }
    for bank in store.text_banks.values().filter(|b| ctx.exposes(b.language)) {
        println!(
            "\nText bank {:#018x} (language {:#x}, {} strings)",
            bank.file_id(),
            bank.language,
            bank.strings.len()
        );
    }
    for video in store.videos.values() {
        let (offset, size) = video.stream_span();
        println!("\nVideo {:#018x} ({} bytes at {:#x})", video.file_id(), size, offset);
    }
    Ok(())
}

fn run_roundtrip(path: &Path, out_dir: &Path) -> Result<()> {
    let archive = Archive::open(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let written = archive.write_to_folder(out_dir)?;

    let original = fs::read(path)?;
    let rewritten = fs::read(&written)?;
    if original == rewritten {
        info!("TOC bytes identical ({} bytes)", original.len());
    } else {
        warn!("TOC bytes differ: {} -> {} bytes", original.len(), rewritten.len());
    }

    let original_stream = fs::read(stream_path(path)).unwrap_or_default();
    let rewritten_stream = fs::read(stream_path(&written)).unwrap_or_default();
    if original_stream != rewritten_stream {
        warn!(
            "Stream bytes differ: {} -> {} bytes",
            original_stream.len(),
            rewritten_stream.len()
        );
    }
    Ok(())
}

fn run_combine(out_dir: &Path, archives: &[PathBuf], patches: &[PathBuf]) -> Result<()> {
    let mut set = WorkingSet::new("combined");
    set.load_archives(archives).context("Failed to load archives")?;
    for patch in patches {
        let report = set
            .import_patch(patch)
            .with_context(|| format!("Failed to import {}", patch.display()))?;
        info!(
            "{}: {} changes, {} unresolved",
            patch.display(),
            report.applied(),
            report.unresolved.len()
        );
    }
    let written = set.write_patch(out_dir)?;
    info!("Combined patch written to {}", written.display());
    Ok(())
}

fn run_extract_audio(path: &Path, id: u32, out_file: &Path) -> Result<()> {
    let mut set = WorkingSet::new("extract");
    set.load_archive(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let data = set.audio_data(id)?;
    fs::write(out_file, data)?;
    info!("Wrote {} bytes of source {id} to {}", data.len(), out_file.display());
    Ok(())
}

fn run_replace_audio(path: &Path, id: u32, payload: &Path, out_dir: &Path) -> Result<()> {
    let mut set = WorkingSet::new("replace");
    set.load_archive(path)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    let data = fs::read(payload)
        .with_context(|| format!("Failed to read {}", payload.display()))?;
    if !set.replace_audio(id, data)? {
        warn!("Source {id} already has this payload; nothing to patch");
        return Ok(());
    }
    let written = set.write_patch(out_dir)?;
    info!("Patch written to {}", written.display());
    Ok(())
}

fn is_archive_candidate(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.ends_with(".stream") || name.ends_with(".gpu_resources") {
        return false;
    }
    let mut magic = [0u8; 4];
    match fs::File::open(path).and_then(|mut f| std::io::Read::read_exact(&mut f, &mut magic)) {
        Ok(()) => u32::from_le_bytes(magic) == toc_modder::toc::header::TocHeader::MAGIC,
        Err(_) => false,
    }
}

fn run_scan(folder: &Path) -> Result<()> {
    info!("Searching for archives in: {:?}", folder);
    let candidates: Vec<PathBuf> = WalkDir::new(folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_archive_candidate(p))
        .collect();

    if candidates.is_empty() {
        warn!("No archives found.");
        return Ok(());
    }
    info!("Found {} archives.", candidates.len());

    let results: Vec<(PathBuf, Result<[usize; 6]>)> = candidates
        .par_iter()
        .map(|path| {
            let summary = Archive::open(path).map_err(anyhow::Error::from).map(|archive| {
                let store = &archive.store;
                [
                    store.streams.len(),
                    store.banks.len(),
                    store.text_banks.len(),
                    store.videos.len(),
                    store.hierarchy.len(),
                    store.audio.len(),
                ]
            });
            (path.clone(), summary)
        })
        .collect();

    let mut totals = [0usize; 6];
    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(counts) => {
                for (total, n) in totals.iter_mut().zip(counts) {
                    *total += n;
                }
            }
            Err(e) => {
                error!("{}: {e}", path.display());
                failed += 1;
            }
        }
    }

    let kinds = [
        AssetKind::Stream,
        AssetKind::Bank,
        AssetKind::TextBank,
        AssetKind::Video,
    ];
    for (kind, total) in kinds.iter().zip(totals) {
        println!("{kind:?}: {total}");
    }
    println!("Hierarchy entries: {}", totals[4]);
    println!("Audio sources: {}", totals[5]);
    println!("Archives decoded: {}, failed: {failed}", candidates.len() - failed);
    Ok(())
}
