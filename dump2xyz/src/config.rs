use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use toml;
use shared::{
    bail,
    ensure,
    info,
    log,
    warn,
    Result,
};
use lammps_parsers::SelectionPolicy;


#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ConvertConfig {
    dump:           PathBuf,
    start_timestep: i64,
    end_timestep:   i64,

    #[serde(default = "ConvertConfig::default_interval")]
    interval:       i64,

    #[serde(default = "ConvertConfig::default_outdir")]
    outdir:         PathBuf,
}


impl ConvertConfig {
    pub fn get_dump(&self) -> &PathBuf { &self.dump }
    pub fn get_start_timestep(&self) -> i64 { self.start_timestep }
    pub fn get_end_timestep(&self) -> i64 { self.end_timestep }
    pub fn get_interval(&self) -> i64 { self.interval }
    pub fn get_outdir(&self) -> &PathBuf { &self.outdir }

    pub fn policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            start:    self.start_timestep,
            end:      self.end_timestep,
            interval: self.interval,
        }
    }

    fn default_interval() -> i64 { 1 }
    fn default_outdir() -> PathBuf { PathBuf::from("output") }

    pub fn from_file<P>(fname: P) -> Result<Self>
    where P: AsRef<Path> {
        ensure!(fname.as_ref().is_file(),
            "Config file {:?} for ConvertConfig not available.", fname.as_ref());
        let raw = fs::read_to_string(fname)?;
        let cfg = toml::from_str::<Self>(&raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_file<P>(&self, fname: P) -> Result<()>
    where P: AsRef<Path> {
        if fname.as_ref().is_file() {
            log::warn!("File {:?} exists, overwriting ...", fname.as_ref());
        }
        fs::write(fname.as_ref(), self.to_string())?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.start_timestep <= self.end_timestep,
            "start_timestep ({}) must not exceed end_timestep ({}).",
            self.start_timestep, self.end_timestep);
        ensure!(self.interval >= 1,
            "interval must be 1 or greater, got {}.", self.interval);
        Ok(())
    }

    /// Create the output directory for this run. An existing directory is
    /// left untouched and the first free numbered sibling is used instead.
    pub fn create_outdir(&self) -> Result<PathBuf> {
        let dir = &self.outdir;

        if dir.is_file() {
            bail!("The output dir {:?} exists as a regular file, please change.", dir);
        }

        if dir.file_name().is_none() {
            bail!("The output dir {:?} cannot be current working dir, please change.", dir);
        }

        let mut target = dir.clone();
        if dir.is_dir() {
            let parent = dir.parent().unwrap();
            let subdir = dir.file_name().unwrap().to_str().unwrap();
            let mut newdir: Option<PathBuf> = None;
            let mut tmpdir = PathBuf::new();

            for i in 1 ..= 99 {
                let dirstr = format!("{}_{:02}", &subdir, i);
                tmpdir = parent.join(&dirstr);
                if !tmpdir.is_file() && !tmpdir.is_dir() {
                    newdir = Some(tmpdir.clone());
                    break;
                }
            }

            if let Some(newdir) = newdir {
                warn!("The outdir {:?} already exists and will be switched to {:?} for this run.", dir, newdir);
                target = newdir;
            } else {
                bail!("Existed outdir reached maximum homonymy outdirs: {:?}", tmpdir);
            }
        }

        info!("Output files will be stored in {:?} .", target);
        fs::create_dir_all(&target)?;

        Ok(target)
    }

    pub fn print_to_log(&self) {
        let config_print = format!("{}", self);
        let hashtag_line = "#".repeat(120);
        info!("Config file loaded. The formatted config is:\n\n{hashtag_line}\n{}\n{hashtag_line}\n\n", config_print);
    }
}


impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            dump: PathBuf::from("traj.dump"),
            start_timestep: 0,
            end_timestep: 10000,
            interval: 1000,
            outdir: PathBuf::from("output"),
        }
    }
}


impl fmt::Display for ConvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# dump2xyz config for LAMMPS dump -> XYZ conversion")?;
        writeln!(f)?;

        writeln!(f, " {:>20} = {:?}", "dump",           self.dump)?;
        writeln!(f, " {:>20} = {}",   "start_timestep", self.start_timestep)?;
        writeln!(f, " {:>20} = {}",   "end_timestep",   self.end_timestep)?;
        writeln!(f, " {:>20} = {}",   "interval",       self.interval)?;
        writeln!(f, " {:>20} = {:?}", "outdir",         self.outdir)?;

        Ok(())
    }
}
