//! labelforge – command-line label design → PDF renderer.
//!
//! Usage:
//!   labelforge <design.json> [output.pdf] [--records rows.json]
//!              [--mapping mapping.json] [--dpi 203|300] [--max-records N]
//!              [--timeout-ms N] [--strict-barcodes] [--report report.json]
//!              [--title "Labels"]
//!
//! Without `--records` one label is rendered with its text verbatim. With
//! `--records` (a JSON array of objects) one page is rendered per record.
//! If `output.pdf` is omitted the PDF is written next to the design file with
//! the same stem (e.g. `shipping.json` → `shipping.pdf`).

use std::{env, fs, path::Path, path::PathBuf, process, time::Duration};

use label_forge::{
    generate_batch, generate_label, BarcodeFallback, BatchRecord, ColumnMapping, Design, Dpi,
    GeneratedDocument, RenderConfig,
};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut design_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut records_path: Option<PathBuf> = None;
    let mut mapping_path: Option<PathBuf> = None;
    let mut report_path: Option<PathBuf> = None;
    let mut title: Option<String> = None;
    let mut config = RenderConfig::default();
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--records" | "-r" => records_path = Some(PathBuf::from(flag_value(&mut iter, arg))),
            "--mapping" | "-m" => mapping_path = Some(PathBuf::from(flag_value(&mut iter, arg))),
            "--report" => report_path = Some(PathBuf::from(flag_value(&mut iter, arg))),
            "--title" | "-t" => title = Some(flag_value(&mut iter, arg)),
            "--dpi" => {
                let value = flag_value(&mut iter, arg);
                config.dpi = match value.parse::<u32>().map_err(|e| e.to_string()).and_then(Dpi::try_from) {
                    Ok(dpi) => Some(dpi),
                    Err(e) => fail(&format!("Invalid --dpi {value:?}: {e}")),
                };
            }
            "--max-records" => {
                let value = flag_value(&mut iter, arg);
                config.max_records = match value.parse::<usize>() {
                    Ok(n) => Some(n),
                    Err(e) => fail(&format!("Invalid --max-records {value:?}: {e}")),
                };
            }
            "--timeout-ms" => {
                let value = flag_value(&mut iter, arg);
                config.fetch_timeout = match value.parse::<u64>() {
                    Ok(ms) => Duration::from_millis(ms),
                    Err(e) => fail(&format!("Invalid --timeout-ms {value:?}: {e}")),
                };
            }
            "--strict-barcodes" => config.barcode_fallback = BarcodeFallback::Skip,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    design_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let design_path = match design_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no design file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    // Default output: same directory + same stem as the design, but with .pdf
    let output = output_path.unwrap_or_else(|| {
        let mut o = design_path.clone();
        o.set_extension("pdf");
        o
    });

    let design = match Design::from_json(&read(&design_path)) {
        Ok(d) => d,
        Err(e) => fail(&format!("Error in '{}': {e}", design_path.display())),
    };

    // Default title: stem of the design filename.
    config.title = title.unwrap_or_else(|| {
        design_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("label-forge output")
            .to_string()
    });

    let result = match &records_path {
        None => generate_label(&design, &config),
        Some(path) => {
            let records = match BatchRecord::list_from_json(&read(path)) {
                Ok(r) => r,
                Err(e) => fail(&format!("Error in '{}': {e}", path.display())),
            };
            let mapping = match &mapping_path {
                None => ColumnMapping::new(),
                Some(path) => match ColumnMapping::from_json(&read(path)) {
                    Ok(m) => m,
                    Err(e) => fail(&format!("Error in '{}': {e}", path.display())),
                },
            };
            generate_batch(&design, &records, &mapping, &config)
        }
    };

    let document = match result {
        Ok(doc) => doc,
        Err(e) => fail(&format!("Error generating PDF: {e}")),
    };

    write(&output, &document.bytes);
    if let Some(path) = &report_path {
        write(path, document.to_json().as_bytes());
    }
    print_skipped(&document);

    let pages = document.page_count;
    eprintln!(
        "Wrote '{}' ({} bytes, {} page{}, {} skipped)",
        output.display(),
        document.bytes.len(),
        pages,
        if pages == 1 { "" } else { "s" },
        document.skipped_count()
    );
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> String {
    match iter.next() {
        Some(v) => v.clone(),
        None => fail(&format!("Missing value for {flag}")),
    }
}

fn read(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(&format!("Error reading '{}': {e}", path.display())),
    }
}

fn write(path: &Path, bytes: &[u8]) {
    // Create output directory if necessary.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                fail(&format!("Error creating output directory: {e}"));
            }
        }
    }
    if let Err(e) = fs::write(path, bytes) {
        fail(&format!("Error writing '{}': {e}", path.display()));
    }
}

fn print_skipped(document: &GeneratedDocument) {
    for page in &document.pages {
        for element in page.skipped() {
            eprintln!(
                "  page {}: {} '{}' {:?}",
                page.page_index + 1,
                element.kind,
                element.element_id,
                element.outcome
            );
        }
    }
}

fn fail(msg: &str) -> ! {
    eprintln!("{msg}");
    process::exit(1);
}

fn print_usage(prog: &str) {
    eprintln!("labelforge – label design to PDF renderer (label-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <design.json> [output.pdf] [--records rows.json] [--mapping mapping.json]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <design.json>      Label design to render");
    eprintln!("  [output.pdf]       Output path  (default: same stem as the design with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --records, -r      JSON array of records; one page per record");
    eprintln!("  --mapping, -m      JSON object mapping record columns to template fields");
    eprintln!("  --dpi              Output DPI, 203 or 300 (default: the design's reference DPI)");
    eprintln!("  --max-records      Refuse batches larger than N");
    eprintln!("  --timeout-ms       Per-image fetch timeout (default: 5000)");
    eprintln!("  --strict-barcodes  Skip unencodable barcodes instead of printing their value");
    eprintln!("  --report           Write the per-element report as JSON");
    eprintln!("  --title, -t        Document title in PDF metadata (default: design filename stem)");
    eprintln!("  --help             Print this message");
}
