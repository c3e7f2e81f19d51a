use std::io::prelude::*;
use std::path::Path;
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::*;

use crate::session::{self, AlertThresholds};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct HeaderSettingsFile {
    pub name: String,
    pub version: u32,
}

/// Persistent defaults. Command-line flags override these per run; control
/// messages override them per running daemon.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SettingsStruct {
    pub header: HeaderSettingsFile,
    pub font: Option<String>,
    pub net_iface: Option<String>,
    pub time_fmt: String,
    pub display_msecs: u64,
    pub short_pause_msecs: u64,
    pub long_pause_msecs: u64,
    pub net_movavg_window: usize,
    pub show_swap: bool,
    pub alerts: AlertThresholds,
}

impl Default for SettingsStruct {
    fn default() -> Self {
        SettingsStruct {
            header: HeaderSettingsFile {
                name: "Status HUD".to_string(),
                version: 0,
            },
            font: None,
            net_iface: None,
            time_fmt: session::DEFAULT_TIME_FMT.to_string(),
            display_msecs: session::DEFAULT_DISPLAY_MSECS,
            short_pause_msecs: session::DEFAULT_SHORT_PAUSE_MSECS,
            long_pause_msecs: session::DEFAULT_LONG_PAUSE_MSECS,
            net_movavg_window: session::DEFAULT_MOVAVG_WINDOW,
            show_swap: true,
            alerts: AlertThresholds::default(),
        }
    }
}

#[derive(Debug)]
struct ManagerStruct {
    pub file_name: String,
    pub config: SettingsStruct,
}

struct Manager {
    pub content: Option<ManagerStruct>,
}

lazy_static! {
    static ref MANAGER: Arc<Mutex<Manager>> = Arc::new(Mutex::new(Manager { content: None }));
}

impl Manager {
    fn new(file_name: &str) -> ManagerStruct {
        let file_name = if !Path::new(file_name).is_absolute() {
            match ProjectDirs::from("com", "statushud", env!("CARGO_PKG_NAME")) {
                Some(project) => {
                    let folder_path = Path::new(project.config_dir());
                    if let Err(error) = std::fs::create_dir_all(folder_path) {
                        error!("Failed to create settings folder: {folder_path:?}, reason: {error:#?}");
                    }
                    folder_path
                        .join(file_name)
                        .to_str()
                        .expect("Failed to create settings path.")
                        .to_string()
                }
                None => panic!("Failed to find user settings path."),
            }
        } else {
            file_name.into()
        };

        debug!("Using settings file: {}", &file_name);

        let settings = ManagerStruct {
            file_name: file_name.clone(),
            config: load_settings_from_file(&file_name),
        };

        save_settings_to_file(&settings.file_name, &settings.config).unwrap_or_else(|error| {
            error!("Failed to save file: {error:#?}");
        });

        settings
    }
}

// Init settings manager with the desired settings file,
// will be created if it does not exist
pub fn init(file_name: Option<&str>) {
    let mut manager = MANAGER.as_ref().lock().unwrap();
    let file_name = file_name.unwrap_or("statushud.json");
    manager.content = Some(Manager::new(file_name));
}

fn load_settings_from_file(file_name: &str) -> SettingsStruct {
    let Ok(contents) = std::fs::read_to_string(file_name) else {
        return SettingsStruct::default();
    };

    serde_json::from_str(&contents).unwrap_or_else(|error| {
        warn!("Settings file {file_name:?} is unusable ({error}), using defaults.");
        SettingsStruct::default()
    })
}

fn save_settings_to_file(file_name: &str, content: &SettingsStruct) -> std::io::Result<()> {
    let mut file = std::fs::File::create(file_name)?;
    let value = serde_json::to_string_pretty(content)?;
    file.write_all(value.as_bytes())
}

// Save the latest state of the settings
pub fn save() {
    let manager = MANAGER.as_ref().lock().unwrap();
    if let Some(content) = &manager.content {
        if let Err(error) = save_settings_to_file(&content.file_name, &content.config) {
            error!(
                "Failed to save settings: file: {:#?}, error: {error:#?}",
                &content.file_name
            );
        }
    }
}

pub fn config() -> SettingsStruct {
    let manager = MANAGER.as_ref().lock().unwrap();
    manager
        .content
        .as_ref()
        .map(|content| content.config.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn generate_random_settings_file_name() -> String {
        use rand::Rng;

        let rand_string: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(30)
            .map(char::from)
            .collect();

        format!("{}/{rand_string}.json", std::env::temp_dir().display())
    }

    #[test]
    #[serial]
    fn init_creates_the_file_with_defaults() {
        let file_name = generate_random_settings_file_name();
        init(Some(&file_name));
        assert!(Path::new(&file_name).exists(), "Settings file does not exist");
        let config = config();
        assert_eq!(config, SettingsStruct::default());
        assert_eq!(config.display_msecs, 2000);
        assert_eq!(config.alerts.min_battery_life_percent, 10);
    }

    #[test]
    #[serial]
    fn corrupt_files_fall_back_to_defaults() {
        let file_name = generate_random_settings_file_name();
        std::fs::write(&file_name, "{ not json").unwrap();
        init(Some(&file_name));
        assert_eq!(config(), SettingsStruct::default());
    }

    #[test]
    #[serial]
    fn saved_settings_survive_a_reload() {
        let file_name = generate_random_settings_file_name();
        init(Some(&file_name));
        {
            let mut manager = MANAGER.as_ref().lock().unwrap();
            manager.content.as_mut().unwrap().config.net_iface = Some("wlan0".to_string());
        }
        save();
        init(Some(&file_name));
        assert_eq!(config().net_iface.as_deref(), Some("wlan0"));
    }
}
