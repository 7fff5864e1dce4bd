/// Table Linter: validates fragment table coverage and template tokens.
///
/// Usage: table_linter [data_dir] [--items <path>] [--npcs <path>] [--taverns <path>]
///
/// With no arguments, reads `forge_data/{magic_items,npcs,taverns}.ron`.

use instantforge::core::template::Template;
use instantforge::{FragmentTable, ItemTable, NpcTable, TavernTable};
use std::path::{Path, PathBuf};
use std::process;

const ITEM_NAME_TOKENS: &[&str] = &["subtype", "adjective", "effectWord", "creatorName"];
const TAVERN_NAME_TOKENS: &[&str] = &["noun", "noun2", "adjective", "ownerName", "establishment"];
const FLAVOR_TOKENS: &[&str] = &["place"];

#[derive(Default)]
struct Report {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Report {
    fn empty_pool(&mut self, owner: &str, pool: &str, items: &[String]) {
        if items.is_empty() {
            self.warnings.push(format!("{} has an empty '{}' pool", owner, pool));
        }
    }

    /// Unknown tokens are left verbatim in output; repeated tokens get the
    /// same draw under the default repeat policy.
    fn templates(&mut self, owner: &str, templates: &[String], known: &[&str]) {
        for raw in templates {
            let template = Template::parse(raw);
            for token in template.placeholders() {
                if !known.contains(&token) {
                    self.errors.push(format!(
                        "{} template '{}' uses unbound placeholder '{{{}}}'",
                        owner, raw, token
                    ));
                }
            }
            for token in template.repeated_placeholders() {
                self.warnings.push(format!(
                    "{} template '{}' repeats '{{{}}}'",
                    owner, raw, token
                ));
            }
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        println!(
            "Usage: table_linter [data_dir] [--items <path>] [--npcs <path>] [--taverns <path>]"
        );
        process::exit(0);
    }

    let mut data_dir = PathBuf::from("forge_data");
    let mut items_path = None;
    let mut npcs_path = None;
    let mut taverns_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--items" if i + 1 < args.len() => {
                i += 1;
                items_path = Some(PathBuf::from(&args[i]));
            }
            "--npcs" if i + 1 < args.len() => {
                i += 1;
                npcs_path = Some(PathBuf::from(&args[i]));
            }
            "--taverns" if i + 1 < args.len() => {
                i += 1;
                taverns_path = Some(PathBuf::from(&args[i]));
            }
            other if !other.starts_with("--") => data_dir = PathBuf::from(other),
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let items_path = items_path.unwrap_or_else(|| data_dir.join("magic_items.ron"));
    let npcs_path = npcs_path.unwrap_or_else(|| data_dir.join("npcs.ron"));
    let taverns_path = taverns_path.unwrap_or_else(|| data_dir.join("taverns.ron"));

    let mut report = Report::default();

    if let Some(items) = load::<ItemTable>(&items_path, &mut report) {
        lint_items(&items, &mut report);
    }
    if let Some(npcs) = load::<NpcTable>(&npcs_path, &mut report) {
        lint_npcs(&npcs, &mut report);
    }
    if let Some(taverns) = load::<TavernTable>(&taverns_path, &mut report) {
        lint_taverns(&taverns, &mut report);
    }

    println!("\n=== Table Lint Report ===\n");

    if report.errors.is_empty() && report.warnings.is_empty() {
        println!("All checks passed!");
    }
    for warning in &report.warnings {
        println!("WARNING: {}", warning);
    }
    for error in &report.errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );

    process::exit(if report.errors.is_empty() { 0 } else { 1 });
}

fn load<T: FragmentTable>(path: &Path, report: &mut Report) -> Option<T> {
    match T::load_from_ron(path) {
        Ok(table) => {
            println!("  Loaded: {}", path.display());
            Some(table)
        }
        Err(e) => {
            report
                .errors
                .push(format!("failed to load {}: {}", path.display(), e));
            None
        }
    }
}

fn lint_items(table: &ItemTable, report: &mut Report) {
    for (item_type, tier) in table.missing_combinations() {
        report.warnings.push(format!(
            "no powers for {} {}; generation will re-randomize",
            tier, item_type
        ));
    }
    for item_type in &table.types {
        let owner = format!("item type '{}'", item_type);
        let Some(data) = table.item_data.get(item_type) else {
            report.errors.push(format!("{} has no itemData entry", owner));
            continue;
        };
        report.empty_pool(&owner, "nameTemplates", &data.name_templates);
        report.empty_pool(&owner, "subtypes", &data.subtypes);
        report.empty_pool(&owner, "adjectives", &data.adjectives);
        report.empty_pool(&owner, "materials", &data.materials);
        report.empty_pool(&owner, "visuals", &data.visuals);
        report.templates(&owner, &data.name_templates, ITEM_NAME_TOKENS);
    }
    report.empty_pool("items", "creators", &table.creators);
    report.empty_pool("items", "histories", &table.histories);
    report.empty_pool("items", "curses", &table.curses);
}

fn lint_npcs(table: &NpcTable, report: &mut Report) {
    for race in table.missing_races() {
        report.errors.push(format!(
            "race '{}' has no usable data; generation will re-randomize",
            race
        ));
    }
    for race in &table.races {
        let Some(data) = table.race(race) else { continue };
        let owner = format!("race '{}'", race);
        for (gender, names) in &data.names {
            if names.is_empty() && data.name_syllables.is_none() {
                report
                    .warnings
                    .push(format!("{} has no {} names and no syllables", owner, gender));
            }
        }
        report.empty_pool(&owner, "appearance.shared.physical", &data.appearance.shared.physical);
    }
    report.empty_pool("npcs", "personalities", &table.personalities);
    report.empty_pool("npcs", "quirks", &table.quirks);
    report.empty_pool("npcs", "voices", &table.voices);
    report.empty_pool("npcs", "mannerisms", &table.mannerisms);
    report.empty_pool("npcs", "secrets", &table.secrets);
    report.empty_pool("npcs", "globalHooks", &table.global_hooks);

    for job in &table.jobs {
        let owner = format!("job '{}'", job);
        report.templates(&owner, table.hooks_for(job), FLAVOR_TOKENS);
        report.templates(&owner, table.goals_for(job), FLAVOR_TOKENS);
        report.templates(&owner, table.offers_for(job), FLAVOR_TOKENS);
    }
    report.templates("npcs", &table.secrets, FLAVOR_TOKENS);
}

fn lint_taverns(table: &TavernTable, report: &mut Report) {
    for tavern_type in table.undescribed_types() {
        report.warnings.push(format!(
            "tavern type '{}' has no descriptions; generation will re-randomize it away",
            tavern_type
        ));
    }
    for (tavern_type, quality) in table.missing_descriptions() {
        report.warnings.push(format!(
            "no description for {} {}; the fallback text will be used",
            quality, tavern_type
        ));
    }
    let names = &table.name_templates;
    report.empty_pool("tavern names", "patterns", &names.patterns);
    report.empty_pool("tavern names", "nouns", &names.nouns);
    report.templates("tavern names", &names.patterns, TAVERN_NAME_TOKENS);
    if names.noun2.len() < 2 {
        report.warnings.push(
            "tavern names: 'noun2' needs at least two entries to differ from 'noun'".to_string(),
        );
    }
    for quality in &table.qualities {
        if !table.signature_drinks.contains_key(quality) {
            report.warnings.push(format!(
                "no signature drinks for quality '{}'; the fallback drink will be used",
                quality
            ));
        }
    }
    report.empty_pool("taverns", "patrons", &table.patrons);
    report.empty_pool("taverns", "rumors", &table.rumors);
}
