use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use shared::{
    Result,
    log::LevelFilter,
};
use log4rs::{
    append::{
        console::{
            ConsoleAppender,
            Target,
        },
        file::FileAppender,
    },
    config::{
        Appender,
        Config,
        Root,
    },
    encode::pattern::PatternEncoder,
    init_config,
    Handle,
};


pub static HANDLE: Lazy<Mutex<Handle>> = Lazy::new(|| {
    let config = gen_logger_config(Option::<&str>::None).unwrap();
    let handle = init_config(config).unwrap();
    Mutex::new(handle)
});


fn gen_logger_config(path: Option<impl AsRef<Path>>) -> Result<Config> {
    const ENCODE_STR: &str = "{d(%Y-%m-%d %H:%M:%S)} [{h({l:>5})}] {m}{n}";

    let level = LevelFilter::Info;

    let stderr = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
        .target(Target::Stderr)
        .build();

    let logfile = path.map(|p| p.as_ref().join("run.log"))
        .map(|file_path| {
            FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(ENCODE_STR)))
                .build(file_path)
                .unwrap()
        });

    let root = Root::builder().appender("stderr");
    let root = if logfile.is_some() { root.appender("logfile") } else { root };
    let root = root.build(level);

    let builder = Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
    let builder = if let Some(logfile) = logfile {
        builder.appender(Appender::builder().build("logfile", Box::new(logfile)))
    } else {
        builder
    };

    let config = builder.build(root)?;

    Ok(config)
}


pub fn logger_init() {
    Lazy::force(&HANDLE);
}


/// Add a `run.log` file appender inside `path`, keeping stderr.
pub fn logger_redirect(path: impl AsRef<Path>) -> Result<()> {
    let config = gen_logger_config(Some(path))?;
    HANDLE.lock().unwrap().set_config(config);
    Ok(())
}
