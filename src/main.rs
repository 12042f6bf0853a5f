use clap::{Parser, Subcommand, ValueEnum};
use mcgfmt::{Container, DcfList, Dgo, Dsp, FamilyFormat, JsonMirror, Opened, Sample, Sar};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "mcgfmt", about = "Inspect and convert MCG signal-analysis files")]
struct Cli {
    /// File family (default: taken from the file extension)
    #[arg(short, long, global = true, value_enum)]
    family: Option<Family>,
    /// Log header and legacy-layout decisions
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show family, header generation and record count
    Info {
        input: PathBuf,
    },
    /// Print every record
    Dump {
        input: PathBuf,
    },
    /// Rewrite any generation, headerless dumps included, as the current one
    Upgrade {
        input:  PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the linear output vector of a SAR file
    Llo {
        input: PathBuf,
        /// Append the severity features
        #[arg(long)]
        extended: bool,
    },
    /// Print the JSON mirror
    Json {
        input: PathBuf,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Family {
    Dcf,
    Dgo,
    Dsp,
    Sar,
    Ecg,
}

impl Family {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Some(match ext.as_str() {
            "dcf" => Family::Dcf,
            "dgo" => Family::Dgo,
            "dsp" => Family::Dsp,
            "sar" => Family::Sar,
            "ecg" => Family::Ecg,
            _ => return None,
        })
    }

    fn format(self) -> &'static FamilyFormat {
        match self {
            Family::Dcf => &mcgfmt::dcf::FORMAT,
            Family::Dgo => &mcgfmt::dgo::FORMAT,
            Family::Dsp => &mcgfmt::dsp::FORMAT,
            Family::Sar => &mcgfmt::sar::FORMAT,
            Family::Ecg => &mcgfmt::ecg::FORMAT,
        }
    }
}

/// A decoded file of any family.
enum Loaded {
    Dcf(DcfList),
    Dgo(Dgo),
    Dsp(Dsp),
    Sar(Sar),
    Ecg(Sample),
}

impl Loaded {
    fn open(family: Family, path: &Path) -> mcgfmt::Result<Self> {
        Ok(match family {
            Family::Dcf => Loaded::Dcf(DcfList::open(path)?),
            Family::Dgo => Loaded::Dgo(Dgo::open(path)?),
            Family::Dsp => Loaded::Dsp(Dsp::open(path)?),
            Family::Sar => Loaded::Sar(Sar::open(path)?),
            Family::Ecg => Loaded::Ecg(Sample::open(path)?),
        })
    }

    fn save(&self, path: &Path) -> mcgfmt::Result<()> {
        match self {
            Loaded::Dcf(c) => c.save(path),
            Loaded::Dgo(c) => c.save(path),
            Loaded::Dsp(c) => c.save(path),
            Loaded::Sar(c) => c.save(path),
            Loaded::Ecg(s) => s.save(path),
        }
    }

    fn to_json(&self) -> mcgfmt::Result<String> {
        match self {
            Loaded::Dcf(c) => c.to_json(),
            Loaded::Dgo(c) => c.to_json(),
            Loaded::Dsp(c) => c.to_json(),
            Loaded::Sar(c) => c.to_json(),
            Loaded::Ecg(s) => s.to_json(),
        }
    }

    /// (timestamp, top-level record count)
    fn summary(&self) -> (u64, usize) {
        match self {
            Loaded::Dcf(c) => (c.timestamp, c.dcfs.len()),
            Loaded::Dgo(c) => (c.timestamp, c.algorithms.len()),
            Loaded::Dsp(c) => (c.timestamp, c.operations.len()),
            Loaded::Sar(c) => (c.timestamp, c.analyses.len()),
            Loaded::Ecg(s) => (s.timestamp(), s.signals.len()),
        }
    }

    fn dump(&self) {
        match self {
            Loaded::Dcf(c) => {
                for dcf in &c.dcfs {
                    println!("  {dcf}");
                }
            }
            Loaded::Dgo(c) => {
                for alg in &c.algorithms {
                    println!("  {} ({})", alg.name, alg.sym);
                    for diag in &alg.diagnoses {
                        println!("    {diag}");
                        for r in &diag.refs {
                            println!("      {:?} {} / {} / {} weight {}",
                                r.ref_type, r.source, r.component, r.item, r.weight);
                        }
                    }
                }
            }
            Loaded::Dsp(c) => {
                for op in &c.operations {
                    println!("  {op}: {} samples", op.data.len());
                }
            }
            Loaded::Sar(c) => {
                for a in &c.analyses {
                    println!("  {a}");
                    for i in &a.indexes {
                        println!("    {i}");
                    }
                    for d in &a.idata {
                        println!("    {d}");
                    }
                }
            }
            Loaded::Ecg(s) => {
                print!("{s}");
                for sig in &s.signals {
                    println!("  {sig}");
                }
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let family = resolve_family(cli.family, &input)?;
            let format = family.format();
            let opened = {
                let mut reader = BufReader::new(File::open(&input)?);
                format.open(&mut reader)?
            };
            let loaded = Loaded::open(family, &input)?;
            let (timestamp, count) = loaded.summary();

            println!("── {} file ──────────────────────────────────────────────", format.name);
            println!("  Path        {}", input.display());
            match opened {
                Opened::Headered { version, generation } => {
                    println!("  Magic       {}", format.magic_str());
                    println!("  Version     {version:.1} ({generation:?} generation)");
                }
                Opened::Legacy(layout) => {
                    println!("  Layout      headerless {} ({} B)", layout.name, layout.size);
                }
            }
            println!("  Timestamp   {timestamp}");
            println!("  Records     {count}");
        }

        // ── Dump ─────────────────────────────────────────────────────────────
        Commands::Dump { input } => {
            let family = resolve_family(cli.family, &input)?;
            let loaded = Loaded::open(family, &input)?;
            println!("{} {}", family.format().name, input.display());
            loaded.dump();
        }

        // ── Upgrade ──────────────────────────────────────────────────────────
        Commands::Upgrade { input, output } => {
            let family = resolve_family(cli.family, &input)?;
            Loaded::open(family, &input)?.save(&output)?;
            println!("Upgraded → {}", output.display());
        }

        // ── Llo ──────────────────────────────────────────────────────────────
        Commands::Llo { input, extended } => {
            let sar = Sar::open(&input)?;
            let llo = if extended { sar.to_llo_extended()? } else { sar.to_llo()? };
            let line: Vec<String> = llo.iter().map(|v| v.to_string()).collect();
            println!("{}", line.join(" "));
        }

        // ── Json ─────────────────────────────────────────────────────────────
        Commands::Json { input } => {
            let family = resolve_family(cli.family, &input)?;
            println!("{}", Loaded::open(family, &input)?.to_json()?);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn resolve_family(explicit: Option<Family>, path: &Path) -> Result<Family, Box<dyn std::error::Error>> {
    explicit
        .or_else(|| Family::from_path(path))
        .ok_or_else(|| format!("cannot tell the family of '{}', pass --family", path.display()).into())
}
