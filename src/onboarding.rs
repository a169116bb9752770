use tracing::info;

use crate::error::SendError;
use crate::mail::{Email, EmailSender};

pub const INVITE_SUBJECT: &str = "PembleBox New User Request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub title: &'static str,
    pub description: &'static str,
    pub link: Option<&'static str>,
}

pub const STEPS: &[Step] = &[
    Step {
        title: "Create an account on Plex",
        description: "Visit plex.tv/sign-up to create your account.",
        link: Some("https://www.plex.tv/sign-up/"),
    },
    Step {
        title: "Download the Plex App",
        description: "Install the Plex app from the app store on your phone or TV. Or watch from your computer with this link.",
        link: Some("https://app.plex.tv/desktop/"),
    },
    Step {
        title: "Share your Plex details",
        description: "Use the form below to send me your username or email",
        link: None,
    },
    Step {
        title: "Accept the friend request",
        description: "Please allow up to 24 hours for me to send you a friend request.",
        link: None,
    },
    Step {
        title: "Find PembleBox",
        description: "Log into Plex and look for PembleBox under the More tab in the side bar",
        link: None,
    },
    Step {
        title: "Start Watching",
        description: "Enjoy the movies and shows!",
        link: None,
    },
];

pub fn invite_email(admin_address: &str, handle: &str) -> Email {
    Email {
        to: admin_address.to_string(),
        subject: INVITE_SUBJECT.to_string(),
        text: format!("New user request from: {handle}"),
    }
}

/// Forward a Plex username or email to the admin. Blank handles never reach the sender.
pub async fn request_invite(
    sender: &dyn EmailSender,
    admin_address: &str,
    handle: &str,
) -> Result<(), SendError> {
    let handle = handle.trim();
    if handle.is_empty() {
        return Err(SendError::InvalidInput(
            "Please enter your Plex username or email".to_string(),
        ));
    }
    sender.send(&invite_email(admin_address, handle)).await?;
    info!(%handle, "invite request sent");
    Ok(())
}
