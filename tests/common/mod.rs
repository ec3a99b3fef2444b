//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;
pub mod recorder;

#[allow(unused_imports)]
pub use fixtures::{
    app_with_instances, bot_for, closed_port_instance, instance_for, message_update_json, mock_send_message,
    quick_resolver_config, redirect_body, test_config,
};
#[allow(unused_imports)]
pub use recorder::{RecordingReply, ReplyCall};
