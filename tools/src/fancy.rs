use colored::Colorize;
use pocketd_common::api::v1::{Builder, BuildState, PublishingStatus};

pub trait Fancy {
    fn fancy(&self) -> String;
}

impl Fancy for BuildState {
    fn fancy(&self) -> String {
        let text = self.to_string();
        match self {
            BuildState::FullyBuilt => text.green().to_string(),
            BuildState::Building => text.cyan().to_string(),
            BuildState::NeedsBuild => text.yellow().to_string(),
            BuildState::DependencyWait | BuildState::ChrootWait | BuildState::ManualDepWait => {
                text.magenta().to_string()
            }
            BuildState::FailedToBuild | BuildState::FailedToUpload => text.red().to_string(),
            BuildState::Superseded | BuildState::Cancelled => text.bright_black().to_string(),
        }
    }
}

impl Fancy for PublishingStatus {
    fn fancy(&self) -> String {
        let text = self.to_string();
        match self {
            PublishingStatus::Published => text.green().to_string(),
            PublishingStatus::Pending => text.yellow().to_string(),
            PublishingStatus::Superseded => text.bright_black().to_string(),
            PublishingStatus::PendingRemoval | PublishingStatus::Removed => text.red().to_string(),
        }
    }
}

impl Fancy for Builder {
    fn fancy(&self) -> String {
        if !self.builder_ok {
            "failed".red().bold().to_string()
        } else if let Some(build_id) = self.current_build {
            format!("building #{}", build_id).bold().to_string()
        } else if self.manual {
            "manual".yellow().to_string()
        } else {
            "idle".blue().to_string()
        }
    }
}
