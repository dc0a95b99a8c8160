pub mod net;
pub mod service_error;
pub mod tokens;
pub mod validation;

pub use net::{client_ip, user_agent};
pub use service_error::ServiceError;
pub use tokens::{
    generate_access_token, generate_client_id, generate_notification_id, generate_session_id,
    generate_subscription_id, generate_task_id, generate_transaction_id, generate_trial_id,
    generate_user_id, generate_visitor_id,
};
pub use validation::{trim_and_validate_field, trim_optional_field};
