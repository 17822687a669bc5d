use std::fmt;
use once_cell::sync::Lazy;


static LOGO_STR: Lazy<&str> = Lazy::new(|| {
    &r"
+--------------------------------------------------------+
|                                                        |
|    dump2xyz  --  LAMMPS trajectory dump to XYZ files   |
|                                                        |
+--------------------------------------------------------+
    ".trim()
});


#[derive(Debug)]
pub struct Version<'a> {
    name:        &'a str,
    logo:        &'a str,
    version_str: &'a str,
}


impl<'a> Version<'a> {
    pub fn new() -> Self {
        Self {
            name:        env!("CARGO_PKG_NAME"),
            logo:        &LOGO_STR,
            version_str: env!("CARGO_PKG_VERSION"),
        }
    }
}


impl<'a> Default for Version<'a> {
    fn default() -> Self {
        Self::new()
    }
}


impl<'a> fmt::Display for Version<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.logo)?;
        writeln!(f)?;
        writeln!(f, "Welcome to use {}!", self.name)?;
        writeln!(f, "    current version:    {}", self.version_str)?;
        Ok(())
    }
}
