use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, error, info};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cisync_config::CisyncConfig;
use cisync_mapping::TypeMap;
use cisync_services::UpdateOptions;
use cisync_transport::RecordingTransport;

#[derive(Parser)]
#[command(name = "cisync", version, about = "PLM admin-object synchronization toolkit (Rust)")]
struct Cli {
    /// Выключить цветной вывод
    #[arg(long)]
    no_color: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Превратить live-экспорт (XML) в канонические .ci файлы
    Export {
        /// Export XML file, or a directory of them
        #[arg(short, long)]
        xml: PathBuf,
        /// Output directory (directory mode); stdout when omitted in file mode
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Показать плоский список атрибутов объекта (CSV)
    Scan {
        #[arg(short, long)]
        xml: PathBuf,
        #[arg(long)]
        out_csv: Option<PathBuf>,
    },

    /// Проверить .ci файл перед обновлением
    Validate {
        #[arg(long)]
        ci: PathBuf,
    },

    /// Сравнить live-объект с .ci файлом
    Diff {
        #[arg(long)]
        live_xml: PathBuf,
        #[arg(long)]
        ci: PathBuf,
        /// Print every row, ignoring list_limit
        #[arg(long, default_value_t = false)]
        full: bool,
    },

    /// Собрать reset+update батч для одного объекта (оффлайн)
    Update {
        #[arg(long)]
        ci: PathBuf,
        /// Current live export; omitted means the object does not exist yet
        #[arg(long)]
        live_xml: Option<PathBuf>,
        #[arg(long)]
        out_script: PathBuf,
        /// Menus the canned transport reports as attached to the tree
        #[arg(long)]
        menu_in_tree: Vec<String>,
    },

    /// Проверить каталог .ci файлов
    Health {
        #[arg(short, long)]
        root: PathBuf,
    },

    /// Выгрузить JSON-схемы отчётов
    Schema {
        #[arg(long, default_value = "")]
        out_dir: PathBuf,
    },
}

trait Runnable {
    fn run(self, ctx: &Context) -> Result<()>;
}

struct Context {
    use_color: bool,
    cfg: CisyncConfig,
    map: TypeMap,
    opts: UpdateOptions,
}

impl Context {
    fn new(use_color: bool) -> Self {
        let cfg = cisync_config::load_config().unwrap_or_default();
        let map = match &cfg.mapping {
            Some(m) => {
                let prefixes = m.prefixes.clone().unwrap_or_default();
                TypeMap::with_overrides(m.suffix.as_deref(), &prefixes)
            }
            None => TypeMap::default(),
        };
        let mut opts = UpdateOptions::default();
        if let Some(update) = &cfg.update {
            if let Some(d) = &update.inquiry_delimiter {
                opts.inquiry_delimiter = d.clone();
            }
            if let Some(t) = &update.tree_menu {
                opts.tree_menu = t.clone();
            }
        }
        Context { use_color, cfg, map, opts }
    }

    fn list_limit(&self) -> usize {
        self.cfg.list_limit.unwrap_or(200)
    }
}

impl Runnable for Commands {
    fn run(self, ctx: &Context) -> Result<()> {
        let cmd_name = format!("{:?}", self);
        info!("▶ Starting command: {}", cmd_name);

        let result = match self {
            Commands::Export { xml, out } => run_export(ctx, xml, out),
            Commands::Scan { xml, out_csv } => run_scan(ctx, xml, out_csv),
            Commands::Validate { ci } => run_validate(ctx, ci),
            Commands::Diff { live_xml, ci, full } => run_diff(ctx, live_xml, ci, full),
            Commands::Update { ci, live_xml, out_script, menu_in_tree } => {
                run_update(ctx, ci, live_xml, out_script, menu_in_tree)
            }
            Commands::Health { root } => run_health(ctx, root),
            Commands::Schema { out_dir } => run_schema(ctx, out_dir),
        };

        match &result {
            Ok(_) => info!("✔ Finished command: {}", cmd_name),
            Err(e) => error!("✖ Command {} failed: {:?}", cmd_name, e),
        }

        result
    }
}

fn run_export(ctx: &Context, xml: PathBuf, out: Option<PathBuf>) -> Result<()> {
    debug!("Export args: xml={:?} out={:?}", xml, out);
    if xml.is_dir() {
        let out_dir = out
            .or_else(|| {
                ctx.cfg
                    .export
                    .as_ref()
                    .and_then(|e| e.out_dir.as_ref())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(|| PathBuf::from("ci"));
        let written =
            cisync_services::export_dir(&xml, &out_dir, &ctx.map, &ctx.opts.inquiry_delimiter)?;
        println!("✔ {} объект(ов) экспортировано в {}", written.len(), out_dir.display());
        return Ok(());
    }

    let text = std::fs::read_to_string(&xml)?;
    let script = cisync_services::export_to_string(&text, &ctx.opts.inquiry_delimiter)?;
    match out {
        Some(path) => {
            std::fs::write(&path, script)?;
            println!("✔ CI сохранён в {}", path.display());
        }
        None => print!("{script}"),
    }
    Ok(())
}

fn run_scan(_ctx: &Context, xml: PathBuf, out_csv: Option<PathBuf>) -> Result<()> {
    debug!("Scan args: xml={:?} out_csv={:?}", xml, out_csv);
    let text = std::fs::read_to_string(&xml)?;
    let obj = cisync_services::export_object(&text)?;
    let rows = cisync_domain::flatten::flatten(&obj);
    if let Some(path) = out_csv {
        let file = std::fs::File::create(path)?;
        cisync_export_csv::write_csv(file, &rows)?;
    } else {
        let stdout = std::io::stdout();
        let lock = stdout.lock();
        cisync_export_csv::write_csv(lock, &rows)?;
    }
    Ok(())
}

fn run_validate(ctx: &Context, ci: PathBuf) -> Result<()> {
    debug!("Validate args: ci={:?}", ci);
    let obj = cisync_services::read_ci_file(&ci, &ctx.map, &ctx.opts)?;
    let msgs = cisync_validate::validate(&obj);
    if msgs.is_empty() {
        println!("✔ Всё чисто, ошибок не найдено");
        return Ok(());
    }
    for m in &msgs {
        if !ctx.use_color {
            println!("[{}] {} {} — {}", m.category, m.kind, m.name, m.message);
        } else {
            use owo_colors::OwoColorize;
            let tag = match m.severity.as_str() {
                "error" => "✖",
                "warning" => "⚠",
                _ => "ℹ",
            };
            let colored_category: String = match m.severity.as_str() {
                "error" => format!("{}", m.category.red()),
                "warning" => format!("{}", m.category.yellow()),
                _ => format!("{}", m.category.cyan()),
            };
            println!(
                "{} [{}] {} {} — {}",
                tag,
                colored_category,
                m.kind.green(),
                m.name.blue(),
                m.message
            );
        }
    }
    if cisync_validate::is_fatal(&msgs) {
        std::process::exit(1);
    }
    Ok(())
}

fn run_diff(ctx: &Context, live_xml: PathBuf, ci: PathBuf, full: bool) -> Result<()> {
    debug!("Diff args: live_xml={:?} ci={:?} full={}", live_xml, ci, full);
    let live = cisync_services::export_object(&std::fs::read_to_string(&live_xml)?)?;
    let desired = cisync_services::read_ci_file(&ci, &ctx.map, &ctx.opts)?;
    let diff = cisync_services::diff_objects(&live, &desired);
    if diff.is_empty() {
        println!("✔ Нет расхождений");
        return Ok(());
    }

    let full = full || ctx.cfg.diff.as_ref().and_then(|d| d.full).unwrap_or(false);
    let limit = if full { usize::MAX } else { ctx.list_limit() };
    let mut printed = 0usize;
    let mut line = |text: String| {
        if printed < limit {
            println!("{text}");
        }
        printed += 1;
    };
    for (attr, value) in &diff.changed {
        line(format!("~ {attr} = {value}"));
    }
    for attr in &diff.only_in_file {
        line(format!("+ {attr}"));
    }
    for attr in &diff.only_in_live {
        line(format!("- {attr}"));
    }
    if printed > limit {
        println!("… ещё {} строк(и), используйте --full", printed - limit);
    }
    Ok(())
}

fn run_update(
    ctx: &Context,
    ci: PathBuf,
    live_xml: Option<PathBuf>,
    out_script: PathBuf,
    menu_in_tree: Vec<String>,
) -> Result<()> {
    debug!(
        "Update args: ci={:?} live_xml={:?} out_script={:?} menu_in_tree={:?}",
        ci, live_xml, out_script, menu_in_tree
    );
    let desired = cisync_services::read_ci_file(&ci, &ctx.map, &ctx.opts)?;
    let current = match &live_xml {
        Some(path) => Some(cisync_services::export_object(&std::fs::read_to_string(path)?)?),
        None => None,
    };

    let mut transport = RecordingTransport::new();
    for name in &menu_in_tree {
        transport.respond(cisync_reset::tree_query(&ctx.opts.tree_menu, name), "true");
    }

    let submission = cisync_services::build_submission(
        current.as_ref(),
        &desired,
        &[],
        &mut transport,
        &ctx.opts,
    )?;
    // The inquiry temp files vanish when the submission drops, so inline
    // their content into the saved batch for offline inspection.
    let mut blob = submission.blob.clone();
    if let Some(path) = submission.script_path() {
        blob.push('\n');
        blob.push_str(&std::fs::read_to_string(path)?);
    }
    std::fs::write(&out_script, blob)?;
    let verb = if submission.created { "создание" } else { "обновление" };
    println!("✔ Батч ({verb}) сохранён в {}", out_script.display());
    Ok(())
}

fn run_health(ctx: &Context, root: PathBuf) -> Result<()> {
    debug!("Health args: root={:?}", root);
    let report = cisync_services::health_scan(&root, &ctx.map, &ctx.opts)?;
    if report.issues.is_empty() {
        println!("✔ {} файл(ов) проверено, проблем нет", report.checked);
        return Ok(());
    }
    for issue in &report.issues {
        if ctx.use_color {
            use owo_colors::OwoColorize;
            println!("✖ [{}] {} — {}", issue.category.red(), issue.path.blue(), issue.error);
        } else {
            println!("[{}] {} — {}", issue.category, issue.path, issue.error);
        }
    }
    println!("{} файл(ов) проверено, {} проблем(ы)", report.checked, report.issues.len());
    std::process::exit(1)
}

fn run_schema(_ctx: &Context, out_dir: PathBuf) -> Result<()> {
    let out_dir = if out_dir.as_os_str().is_empty() {
        PathBuf::from("./docs/assets/schemas")
    } else {
        out_dir
    };
    std::fs::create_dir_all(&out_dir)?;
    macro_rules! dump {
        ($ty:ty, $name:literal) => {{
            let schema = schemars::schema_for!($ty);
            let path = out_dir.join($name);
            let f = std::fs::File::create(&path)?;
            serde_json::to_writer_pretty(f, &schema)?;
        }};
    }
    dump!(cisync_domain::ValidationMsg, "validation_msg.schema.json");
    dump!(cisync_domain::DiffOutput, "diff_output.schema.json");
    dump!(cisync_domain::SyncSummary, "sync_summary.schema.json");
    dump!(cisync_domain::HealthReport, "health_report.schema.json");
    dump!(cisync_domain::FlatAttr, "flat_attr.schema.json");
    println!("✔ Схемы выгружены в {}", out_dir.display());
    Ok(())
}

fn init_tracing() {
    let file_appender = rolling::daily("logs", "cisync.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    std::mem::forget(_guard);
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    cli.cmd.run(&Context::new(use_color))
}
