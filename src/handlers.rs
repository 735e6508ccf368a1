//! Placeholder intent handlers — replace these with your skill's actions.
//!
//! Every handler follows the same convention: end the dialogue session
//! first with no follow-up prompt (a handler that wants a multi-turn
//! exchange would request continuation instead), perform the action, then
//! start a notification on the originating site with the spoken result.

use tracing::info;

use crate::dialogue::{DialogueApi, IntentMessage};
use crate::error::AppError;

pub fn action_one(api: &dyn DialogueApi, msg: &IntentMessage) -> Result<(), AppError> {
    api.end_session(&msg.session_id, "")?;

    // action code goes here...
    info!(intent = %msg.intent.intent_name, "intent received");

    // speak the execution result on the site that asked
    api.start_session_notification(&msg.site_id, "Action one has been done", None)?;
    Ok(())
}

pub fn action_two(api: &dyn DialogueApi, msg: &IntentMessage) -> Result<(), AppError> {
    api.end_session(&msg.session_id, "")?;

    // action code goes here...
    info!(intent = %msg.intent.intent_name, "intent received");

    api.start_session_notification(&msg.site_id, "Action two has been done", None)?;
    Ok(())
}
