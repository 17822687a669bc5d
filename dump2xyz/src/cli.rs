use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use clap::{
    Parser,
    ValueEnum,
    builder::styling::{
        AnsiColor,
        Effects,
        Styles,
    },
};

use shared::{log, info, Result};
use lammps_parsers::{
    dump,
    TrajectoryConverter,
};

use crate::config::ConvertConfig;
use crate::logging::{logger_init, logger_redirect};
use crate::version::Version;


pub fn get_style() -> Styles {
    static INSTANCE: OnceLock<Styles> = OnceLock::new();
    INSTANCE.get_or_init(|| {
        Styles::styled()
            .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
            .usage(AnsiColor::Green.on_default()   | Effects::BOLD)
            .literal(AnsiColor::Green.on_default() | Effects::BOLD)
            .placeholder(AnsiColor::BrightBlue.on_default())
            .error(AnsiColor::BrightRed.on_default())
            .valid(AnsiColor::BrightYellow.on_default())
    }).to_owned()
}


pub trait OptProcess : Parser {
    fn process(&self) -> Result<()>;
}


#[derive(Debug, Parser)]
#[command(name = "dump2xyz",
          about = Version::new().to_string(),
          version,
          styles = get_style())]
enum Opt {
    Convert(ConvertCommand),
}


impl OptProcess for Opt {
    fn process(&self) -> Result<()> {
        use Opt::*;

        logger_init();
        log::info!("Global logger initialized with target being stderr");

        match self {
            Convert(cmd) => cmd.process(),
        }
    }
}


#[derive(Debug, Parser)]
/// Convert a LAMMPS trajectory dump into one XYZ file per selected timestep.
pub struct ConvertCommand {
    #[arg(short='c', long, default_value="convert_config.toml", aliases=["cfg", "conf"])]
    /// Config file name.
    ///
    /// Aliases: "cfg", "conf".
    config: PathBuf,

    #[arg(long, value_enum, alias="gen")]
    /// Generate auxiliary files and exit without converting.
    ///
    /// Alias: "gen"
    generate: Option<TemplateGenerator>,
}


#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TemplateGenerator {
    #[value(aliases=["config", "cfg", "conf"])]
    /// Generate a config template for the conversion. Aliases: "config", "cfg", "conf".
    ConfigTemplate,
}


impl OptProcess for ConvertCommand {
    fn process(&self) -> Result<()> {
        use TemplateGenerator::*;

        if let Some(g) = self.generate {
            return match g {
                ConfigTemplate => ConvertConfig::default().to_file("convert_config_template.toml"),
            }
        }

        let cfg = ConvertConfig::from_file(&self.config)?;
        let outdir = cfg.create_outdir()?;
        logger_redirect(&outdir)?;
        cfg.print_to_log();

        let source = cfg.get_dump()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| cfg.get_dump().display().to_string());

        info!("Reading dump file {:?} ...", cfg.get_dump());
        let text = dump::read_dump(cfg.get_dump())?;

        let conversion = TrajectoryConverter::new(&source, cfg.policy()).convert(&text);

        for record in conversion.outputs.iter() {
            let path = outdir.join(&record.filename);
            fs::write(&path, &record.content)?;
            info!("Wrote {:?}", path);
        }

        print_conversion_log(&conversion.log);
        info!("{} file(s) written to {:?}", conversion.outputs.len(), outdir);

        Ok(())
    }
}


fn print_conversion_log(log: &str) {
    let hashtag_line = "#".repeat(120);
    info!("Conversion finished. The run log is:\n\n{hashtag_line}\n{}\n{hashtag_line}\n\n", log);
}


pub fn run() -> Result<()> {
    Opt::parse().process()
}
