use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::category::{
  DEFAULT_COLOR,
  DEFAULT_ICON,
  HOME
};

pub const RC_FILE: &str = ".docketrc";
pub const RC_ENV_VAR: &str = "DOCKETRC";
const DATA_DIR_NAME: &str = "docket";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::defaults();

    let rc = resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading docketrc");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no docketrc found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  /// Built-in values, before any rc file
  /// or override is applied.
  pub fn defaults() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      ("default.command", "list"),
      ("default.category", HOME),
      ("default.icon", DEFAULT_ICON),
      ("default.color", DEFAULT_COLOR),
      ("category.unique", "on"),
      ("color", "on")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Config {
      map,
      loaded_files: vec![]
    }
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  /// `None` when the key is unset; an
  /// error when the value is not a boolean.
  pub fn get_bool(
    &self,
    key: &str
  ) -> anyhow::Result<Option<bool>> {
    let Some(value) = self.map.get(key)
    else {
      return Ok(None);
    };
    parse_bool(value)
      .map(Some)
      .ok_or_else(|| {
        anyhow!(
          "invalid boolean for {key}: \
           {value}"
        )
      })
  }

  pub fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let mut including = Vec::new();
    self.load_file_nested(
      path,
      &mut including
    )
  }

  /// `including` holds the canonical
  /// paths of the files whose includes
  /// are being processed.
  #[tracing::instrument(skip(
    self, including
  ))]
  fn load_file_nested(
    &mut self,
    path: &Path,
    including: &mut Vec<PathBuf>
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let canonical =
      fs::canonicalize(&path)
        .unwrap_or_else(|_| path.clone());
    if including.contains(&canonical) {
      return Err(anyhow!(
        "include cycle: {} includes \
         itself",
        path.display()
      ));
    }

    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            strip_inline_comment(
              include_rest
            )
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          including.push(canonical.clone());
          let loaded = self
            .load_file_nested(
              &include_path,
              including
            );
          including.pop();
          loaded?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value =
        strip_inline_comment(v).to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Typed view of the keys the application
/// state reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
  pub default_category: String,
  pub default_icon: String,
  pub default_color: String,
  pub unique_categories: bool
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      default_category: HOME.to_string(),
      default_icon: DEFAULT_ICON
        .to_string(),
      default_color: DEFAULT_COLOR
        .to_string(),
      unique_categories: true
    }
  }
}

impl Settings {
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let defaults = Self::default();
    let default_category = cfg
      .get("default.category")
      .map(|v| v.trim().to_string())
      .filter(|v| !v.is_empty())
      .ok_or_else(|| {
        anyhow!(
          "default.category cannot be \
           empty"
        )
      })?;

    Ok(Self {
      default_category,
      default_icon: cfg
        .get("default.icon")
        .unwrap_or(defaults.default_icon),
      default_color: cfg
        .get("default.color")
        .unwrap_or(defaults.default_color),
      unique_categories: cfg
        .get_bool("category.unique")?
        .unwrap_or(
          defaults.unique_categories
        )
    })
  }
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping docketrc"
    );
    return Ok(None);
  };
  let candidate = home.join(RC_FILE);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

/// Per-user configuration directory, e.g.
/// `~/.config/docket` on Linux.
fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::config_dir()
    .or_else(dirs::home_dir)
    .ok_or_else(|| {
      anyhow!(
        "cannot determine a \
         configuration directory"
      )
    })?;
  Ok(base.join(DATA_DIR_NAME))
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

/// `#` starts a comment only after
/// whitespace, so `#rrggbb` values survive.
fn strip_inline_comment(
  value: &str
) -> &str {
  let value = value.trim();
  let cut = value
    .char_indices()
    .find(|(idx, ch)| {
      *ch == '#'
        && value[..*idx]
          .ends_with(char::is_whitespace)
    })
    .map(|(idx, _)| idx)
    .unwrap_or(value.len());
  value[..cut].trim_end()
}

fn parse_bool(s: &str) -> Option<bool> {
  match s
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "1" | "y" | "yes" | "on"
    | "true" => Some(true),
    | "0" | "n" | "no" | "off"
    | "false" => Some(false),
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::{
    Config,
    Settings,
    resolve_data_dir
  };

  #[test]
  fn defaults_produce_default_settings()
  {
    let cfg = Config::defaults();
    assert_eq!(
      cfg.get("default.command")
        .as_deref(),
      Some("list")
    );
    let settings =
      Settings::from_config(&cfg)
        .expect("settings");
    assert_eq!(
      settings,
      Settings::default()
    );
  }

  #[test]
  fn rc_file_values_and_includes_apply()
  {
    let temp =
      tempdir().expect("tempdir");
    let extra =
      temp.path().join("extra.rc");
    fs::write(
      &extra,
      "default.icon = 📚\n"
    )
    .expect("write include");
    let main = temp.path().join("main.rc");
    fs::write(
      &main,
      "# comment\n\
       default.category = Work  # trailing\n\
       category.unique = off\n\
       include extra.rc\n\
       include missing.rc\n"
    )
    .expect("write rc");

    let mut cfg = Config::defaults();
    cfg.load_file(&main).expect("load");

    let settings =
      Settings::from_config(&cfg)
        .expect("settings");
    assert_eq!(
      settings.default_category,
      "Work"
    );
    assert_eq!(
      settings.default_icon,
      "📚"
    );
    assert!(!settings.unique_categories);
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn hex_colors_are_not_comments() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("color.rc");
    fs::write(
      &rc,
      "default.color = #ffcc00 # amber\n"
    )
    .expect("write rc");

    let mut cfg = Config::defaults();
    cfg.load_file(&rc).expect("load");
    assert_eq!(
      cfg.get("default.color")
        .as_deref(),
      Some("#ffcc00")
    );
  }

  #[test]
  fn invalid_lines_are_rejected() {
    let temp =
      tempdir().expect("tempdir");
    let rc = temp.path().join("bad.rc");
    fs::write(&rc, "not a pair\n")
      .expect("write rc");

    let mut cfg = Config::defaults();
    let err = cfg
      .load_file(&rc)
      .expect_err("bad line");
    assert!(
      err
        .to_string()
        .contains("invalid config line")
    );
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![
      (
        "rc.color".to_string(),
        "off".to_string()
      ),
      (
        "default.category".to_string(),
        "Diet".to_string()
      ),
    ]);
    assert_eq!(
      cfg
        .get_bool("color")
        .expect("color"),
      Some(false)
    );
    assert_eq!(
      cfg.get("default.category")
        .as_deref(),
      Some("Diet")
    );
  }

  #[test]
  fn blank_default_category_is_an_error()
  {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![(
      "default.category".to_string(),
      "  ".to_string()
    )]);
    assert!(
      Settings::from_config(&cfg).is_err()
    );
  }

  #[test]
  fn data_dir_override_is_created() {
    let temp =
      tempdir().expect("tempdir");
    let target =
      temp.path().join("nested/data");
    let dir = resolve_data_dir(
      &Config::defaults(),
      Some(&target)
    )
    .expect("resolve");
    assert_eq!(dir, target);
    assert!(target.is_dir());
  }

  #[test]
  fn unknown_boolean_values_are_rejected()
  {
    let mut cfg = Config::defaults();
    cfg.apply_overrides(vec![(
      "category.unique".to_string(),
      "sometimes".to_string()
    )]);
    let err = Settings::from_config(&cfg)
      .expect_err("bad boolean");
    assert!(
      err
        .to_string()
        .contains("category.unique")
    );

    cfg.apply_overrides(vec![(
      "category.unique".to_string(),
      "n".to_string()
    )]);
    assert!(
      !Settings::from_config(&cfg)
        .expect("settings")
        .unique_categories
    );
  }

  #[test]
  fn include_cycles_are_errors() {
    let temp =
      tempdir().expect("tempdir");
    let own = temp.path().join("self.rc");
    fs::write(&own, "include self.rc\n")
      .expect("write self rc");

    let mut cfg = Config::defaults();
    let err = cfg
      .load_file(&own)
      .expect_err("self include");
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );

    let a = temp.path().join("a.rc");
    let b = temp.path().join("b.rc");
    fs::write(
      &a,
      "color = off\ninclude b.rc\n"
    )
    .expect("write a");
    fs::write(&b, "include a.rc\n")
      .expect("write b");

    let mut cfg = Config::defaults();
    let err = cfg
      .load_file(&a)
      .expect_err("mutual include");
    assert!(
      format!("{err:#}")
        .contains("include cycle")
    );
  }

  #[test]
  fn same_file_may_be_included_twice() {
    let temp =
      tempdir().expect("tempdir");
    fs::write(
      temp.path().join("shared.rc"),
      "default.icon = 📚\n"
    )
    .expect("write shared");
    let main = temp.path().join("main.rc");
    fs::write(
      &main,
      "include shared.rc\ninclude shared.rc\n"
    )
    .expect("write main");

    let mut cfg = Config::defaults();
    cfg.load_file(&main).expect("load");
    assert_eq!(cfg.loaded_files.len(), 3);
  }
}
