/// Preview: interactive generation shell for trying fragment tables.
///
/// Usage: preview --kind <item|npc|tavern> [--data <dir>] [--store <dir>] [--seed <n>]
///
/// Commands:
///   gen [force]            generate a record (force ignores filters)
///   filter <key> <value>   set a filter ("-" clears it)
///   lock <field>           toggle the lock on a field
///   reveal                 reveal the concealed field
///   copy                   print the clipboard summary
///   save | history         save the current record / list saved entries
///   delete <id>            delete a saved entry
///   clear                  delete every saved entry
///   export <fmt> [path]    export history as json, csv, md or pdf
///   bulk <n>               generate n records with variety stats
///   help | quit

use instantforge::assemble::{ItemAssembler, NpcAssembler, TavernAssembler};
use instantforge::export::ExportFormat;
use instantforge::store::{JsonFileStore, KeyValueStore, MemoryStore};
use instantforge::{
    AssetKind, Assembler, FieldSet, FragmentTable, ItemTable, NpcTable, Session, TavernTable,
    Workbench,
};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut kind = None;
    let mut data_dir = PathBuf::from("forge_data");
    let mut store_dir = None;
    let mut seed = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--kind" if i + 1 < args.len() => {
                i += 1;
                kind = AssetKind::from_name(&args[i]);
            }
            "--data" if i + 1 < args.len() => {
                i += 1;
                data_dir = PathBuf::from(&args[i]);
            }
            "--store" if i + 1 < args.len() => {
                i += 1;
                store_dir = Some(PathBuf::from(&args[i]));
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse::<u64>().ok();
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(kind) = kind else {
        eprintln!("--kind must be one of: item, npc, tavern");
        std::process::exit(1);
    };

    match store_dir {
        Some(dir) => match JsonFileStore::new(&dir) {
            Ok(store) => {
                println!("History stored under {}", dir.display());
                start(kind, &data_dir, store, seed);
            }
            Err(e) => {
                eprintln!("ERROR opening store {}: {}", dir.display(), e);
                std::process::exit(1);
            }
        },
        None => start(kind, &data_dir, MemoryStore::new(), seed),
    }
}

fn start<S: KeyValueStore>(kind: AssetKind, data_dir: &Path, store: S, seed: Option<u64>) {
    let session = match seed {
        Some(seed) => {
            println!("Seed: {}", seed);
            Session::seeded(seed)
        }
        None => Session::from_entropy(),
    };
    match kind {
        AssetKind::Item => {
            let table: ItemTable = load_table(&data_dir.join("magic_items.ron"));
            run(Workbench::new(ItemAssembler::new(table, session), store));
        }
        AssetKind::Npc => {
            let table: NpcTable = load_table(&data_dir.join("npcs.ron"));
            run(Workbench::new(NpcAssembler::new(table, session), store));
        }
        AssetKind::Tavern => {
            let table: TavernTable = load_table(&data_dir.join("taverns.ron"));
            run(Workbench::new(TavernAssembler::new(table, session), store));
        }
    }
}

fn load_table<T: FragmentTable>(path: &Path) -> T {
    match T::load_from_ron(path) {
        Ok(table) => {
            println!("Loaded table: {}", path.display());
            table
        }
        Err(e) => {
            eprintln!("ERROR loading {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn run<A: Assembler, S: KeyValueStore>(mut bench: Workbench<A, S>) {
    println!(
        "{} generator ready, {} saved. Type 'help' for commands.\n",
        bench.kind().noun(),
        bench.history().len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}> ", bench.kind().name());
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help::<A::Field>(),
            "gen" | "g" => {
                let force = parts.get(1) == Some(&"force");
                let outcome = bench.generate(force).map(|_| ());
                match outcome {
                    Ok(()) => print_current(&bench),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "filter" => {
                if parts.len() < 3 {
                    println!("Usage: filter <key> <value|->");
                    let current = serde_json::to_string(bench.filters()).unwrap_or_default();
                    println!("  Current: {}", current);
                    continue;
                }
                let value = parts[2..].join(" ");
                match update_filter::<A>(bench.filters(), parts[1], &value) {
                    Ok(filters) => bench.set_filters(filters),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "lock" => {
                let field = parts.get(1).and_then(|k| <A::Field as FieldSet>::from_key(k));
                let Some(field) = field else {
                    println!("Usage: lock <field>");
                    continue;
                };
                match bench.toggle_lock(field) {
                    Ok(true) => println!("{} locked.", field.label()),
                    Ok(false) => println!("{} unlocked.", field.label()),
                    Err(e) => println!("ERROR: {}", e),
                }
            }
            "reveal" => match bench.reveal() {
                Ok(value) => println!("{}", value),
                Err(e) => println!("ERROR: {}", e),
            },
            "copy" => match bench.copy_text() {
                Ok(text) => println!("\n{}\n", text),
                Err(e) => println!("ERROR: {}", e),
            },
            "save" => match bench.save_current() {
                Ok(id) => println!("Saved as {}.", id),
                Err(e) => println!("ERROR: {}", e),
            },
            "history" => {
                if bench.history().is_empty() {
                    println!("No saved {} entries.", bench.kind().noun());
                }
                for entry in bench.history().entries() {
                    println!("  {}  {} ({})", entry.id, entry.name(), entry.subtitle());
                }
            }
            "delete" => match parts.get(1).and_then(|s| s.parse::<u64>().ok()) {
                Some(id) => match bench.delete_saved(id) {
                    Ok(true) => println!("Deleted {}.", id),
                    Ok(false) => println!("No saved entry {}.", id),
                    Err(e) => println!("ERROR: {}", e),
                },
                None => println!("Usage: delete <id>"),
            },
            "clear" => {
                print!("Delete all {} saved entries? [y/N] ", bench.history().len());
                stdout.flush().ok();
                let mut answer = String::new();
                stdin.lock().read_line(&mut answer).ok();
                let confirmed = answer.trim().eq_ignore_ascii_case("y");
                match bench.clear_history(confirmed) {
                    Ok(n) => println!("Removed {} entries.", n),
                    Err(e) => println!("{}", e),
                }
            }
            "export" => {
                let Some(format) = parts.get(1).and_then(|f| ExportFormat::from_name(f)) else {
                    println!("Usage: export <json|csv|md|pdf> [path]");
                    continue;
                };
                match bench.export(format) {
                    Ok(doc) => {
                        let path = parts
                            .get(2)
                            .map(|p| PathBuf::from(*p))
                            .unwrap_or_else(|| PathBuf::from(&doc.file_name));
                        match std::fs::write(&path, &doc.content) {
                            Ok(()) => println!("Wrote {} ({}).", path.display(), doc.mime_type),
                            Err(e) => println!("ERROR writing {}: {}", path.display(), e),
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            "bulk" => {
                let Some(n) = parts.get(1).and_then(|s| s.parse::<usize>().ok()) else {
                    println!("Usage: bulk <n>");
                    continue;
                };
                bulk(&mut bench, n);
            }
            _ => {
                println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
            }
        }
    }
}

fn print_current<A: Assembler, S: KeyValueStore>(bench: &Workbench<A, S>) {
    let Some(current) = bench.current() else { return };
    println!();
    for (field, value) in current.record.visible() {
        let marker = if bench.locks().is_locked(field) { " [locked]" } else { "" };
        println!("{}{}: {}", field.label(), marker, value);
    }
    println!(
        "{}: {}",
        bench.kind().concealed().label,
        current.record.concealed().display()
    );
    println!();
}

/// Round-trip the filters through JSON so one command works for every
/// kind.
fn update_filter<A: Assembler>(
    filters: &A::Filters,
    key: &str,
    value: &str,
) -> Result<A::Filters, serde_json::Error> {
    let mut json = serde_json::to_value(filters)?;
    if let Some(map) = json.as_object_mut() {
        let value = if value == "-" {
            serde_json::Value::Null
        } else {
            serde_json::Value::String(value.to_string())
        };
        map.insert(key.to_string(), value);
    }
    serde_json::from_value(json)
}

fn bulk<A: Assembler, S: KeyValueStore>(bench: &mut Workbench<A, S>, n: usize) {
    let mut names = HashSet::new();
    let mut concealed = HashSet::new();
    let mut errors = 0;
    for _ in 0..n {
        match bench.generate(true) {
            Ok(assembled) => {
                names.insert(assembled.record.name().to_string());
                concealed.insert(assembled.record.concealed().value().to_string());
            }
            Err(_) => errors += 1,
        }
    }
    println!("\n=== Bulk Generation: {} records ({} errors) ===\n", n, errors);
    println!("Unique names: {} / {}", names.len(), n - errors);
    println!(
        "Unique {} values: {}",
        bench.kind().concealed().label.to_lowercase(),
        concealed.len()
    );
    print_current(bench);
}

fn print_usage() {
    println!("Preview: interactive generation shell for fragment tables.");
    println!();
    println!("Usage: preview --kind <item|npc|tavern> [--data <dir>] [--store <dir>] [--seed <n>]");
    println!();
    println!("  --kind <kind>   Generator to run");
    println!("  --data <dir>    Directory holding the .ron tables (default: forge_data)");
    println!("  --store <dir>   Persist history as JSON files here (default: in memory)");
    println!("  --seed <n>      RNG seed (default: from entropy)");
}

fn print_help<F: FieldSet>() {
    println!("Commands:");
    println!("  gen [force]            Generate a record (force ignores filters)");
    println!("  filter <key> <value>   Set a filter; '-' clears it");
    println!("  lock <field>           Toggle the lock on a field");
    println!("  reveal                 Reveal the concealed field");
    println!("  copy                   Print the clipboard summary");
    println!("  save                   Save the current record");
    println!("  history                List saved entries");
    println!("  delete <id>            Delete a saved entry");
    println!("  clear                  Delete every saved entry (asks first)");
    println!("  export <fmt> [path]    Export history: json, csv, md, pdf");
    println!("  bulk <n>               Generate n records with variety statistics");
    println!("  help                   Show this help");
    println!("  quit                   Exit");
    println!();
    let lockable: Vec<&str> = F::ALL.iter().filter(|f| f.lockable()).map(|f| f.key()).collect();
    println!("Lockable fields: {}", lockable.join(", "));
}
