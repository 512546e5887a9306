use crate::relay::submit::{FormSession, SessionFactory};
use crate::relay::{AutomationSnafu, RelayResult};

use headless_chrome::{Browser, LaunchOptions, Tab};
use log::debug;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

// The automation layer reports its own error types; the pipeline only cares
// that the attempt failed, so everything collapses into one variant.
fn automation<T, E: Display>(res: Result<T, E>) -> RelayResult<T> {
    res.map_err(|e| {
        AutomationSnafu {
            message: e.to_string(),
        }
        .build()
    })
}

/// Launches one headless Chrome per submission attempt, each with a fresh
/// temporary profile directory, so no cookies, storage or form state can
/// leak from one record to the next.
pub struct ChromeLauncher {
    binary_path: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new(binary_path: Option<String>) -> ChromeLauncher {
        ChromeLauncher {
            binary_path: binary_path.map(PathBuf::from),
        }
    }
}

pub struct ChromeSession {
    tab: Arc<Tab>,
    // Owns the browser process and the profile directory for the lifetime of
    // the attempt; both are torn down when the session is closed.
    _browser: Browser,
    _profile: TempDir,
}

impl SessionFactory for ChromeLauncher {
    type Session = ChromeSession;

    fn open_session(&self) -> RelayResult<ChromeSession> {
        let profile = automation(TempDir::new())?;
        debug!("launching chrome with profile {:?}", profile.path());
        let options = automation(
            LaunchOptions::default_builder()
                .headless(true)
                .path(self.binary_path.clone())
                .user_data_dir(Some(profile.path().to_path_buf()))
                .build(),
        )?;
        let browser = automation(Browser::new(options))?;
        let tab = automation(browser.new_tab())?;
        Ok(ChromeSession {
            tab,
            _browser: browser,
            _profile: profile,
        })
    }
}

impl FormSession for ChromeSession {
    fn open(&mut self, url: &str) -> RelayResult<()> {
        automation(self.tab.navigate_to(url))?;
        automation(self.tab.wait_until_navigated())?;
        Ok(())
    }

    fn fill(&mut self, field_name: &str, value: &str) -> RelayResult<()> {
        let selector = format!("[name='{}']", field_name);
        let element = automation(self.tab.wait_for_element(&selector))?;
        automation(element.click())?;
        automation(self.tab.type_str(value))?;
        Ok(())
    }

    fn click(&mut self, selector: &str) -> RelayResult<()> {
        let element = automation(self.tab.wait_for_element(selector))?;
        automation(element.click())?;
        Ok(())
    }

    fn read_text(&mut self, selector: &str) -> RelayResult<String> {
        let element = automation(self.tab.wait_for_element(selector))?;
        automation(element.get_inner_text())
    }

    fn close(self) {
        // Dropping the browser ends the Chrome process; dropping the TempDir
        // removes the profile directory.
        debug!("closing the form session");
    }
}
