use crystal_gpio::lcd::hd44780::driver::{DisplayGeometry, FontSize};
use eyre::WrapErr;
use serde::{Deserialize, Serialize};
use std::env::var_os;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub cols: u8,
    pub lines: u8,
    /// Use the 5x10 font. Only honored on single-line displays.
    pub large_font: bool,
    pub cursor: bool,
    pub blink: bool,
    /// Print each row from its last column towards the first.
    pub right_to_left: bool,
    /// Text for each row, top to bottom. `\u0000`..`\u0007` print the custom glyphs.
    pub message: Vec<String>,
    /// Custom 5x8 glyphs, stored in CGRAM slots in order. At most 8 are used.
    pub glyphs: Vec<[u8; 8]>,
}

impl Config {
    /// Path of the config file: `CONFIG_FILE`, or `config.json` in the working directory.
    pub fn path() -> PathBuf {
        var_os("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.json"))
    }

    /// Loads the config from [Self::path]. See [Self::load_from].
    pub fn try_load() -> eyre::Result<Option<Self>> {
        Self::load_from(&Self::path())
    }

    /// Returns `Ok(None)` only if there is no file at `path`. A file that can't be read or
    /// parsed is an error, so it never gets replaced by the defaults.
    pub fn load_from(path: &Path) -> eyre::Result<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).wrap_err_with(|| format!("Could not open {}", path.display()));
            }
        };
        let config = serde_json::from_reader(BufReader::new(file))
            .wrap_err_with(|| format!("Could not parse {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn save(&self) -> eyre::Result<()> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> eyre::Result<()> {
        let file = File::create(path)
            .wrap_err_with(|| format!("Could not create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn geometry(&self) -> DisplayGeometry {
        let font = if self.large_font {
            FontSize::Dots5x10
        } else {
            FontSize::Dots5x8
        };
        DisplayGeometry::new(self.cols, self.lines).with_font(font)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cols: 16,
            lines: 2,
            large_font: false,
            cursor: false,
            blink: false,
            right_to_left: false,
            message: vec![
                "Hello, world! \u{0}".to_string(),
                concat!("crystal v", env!("CARGO_PKG_VERSION")).to_string(),
            ],
            glyphs: vec![[0x00, 0x0A, 0x1F, 0x1F, 0x0E, 0x04, 0x00, 0x00]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{ "cols": 20, "lines": 4 }"#).unwrap();

        assert_eq!(config.cols, 20);
        assert_eq!(config.lines, 4);
        assert_eq!(config.glyphs, Config::default().glyphs);
        assert!(!config.cursor);
    }

    #[test]
    fn large_font_maps_to_geometry() {
        let config = Config {
            lines: 1,
            large_font: true,
            ..Config::default()
        };

        assert_eq!(
            config.geometry(),
            DisplayGeometry::new(16, 1).with_font(FontSize::Dots5x10)
        );
    }

    #[test]
    fn glyph_escapes_survive_json() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        let config: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config, Config::default());
        assert!(config.message[0].ends_with('\u{0}'));
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert_eq!(Config::load_from(&path).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn saved_file_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            cols: 20,
            lines: 4,
            ..Config::default()
        };

        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), Some(config));
    }

    #[test]
    fn malformed_file_is_an_error_and_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let contents = r#"{ "cols": 20, "lines": "#;
        std::fs::write(&path, contents).unwrap();

        let err = Config::load_from(&path).unwrap_err();

        assert!(err.to_string().contains("Could not parse"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[test]
    fn glyph_rows_must_be_eight() {
        let result = serde_json::from_str::<Config>(r#"{ "glyphs": [[1, 2, 3]] }"#);
        assert!(result.is_err());
    }
}
