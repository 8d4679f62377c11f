//! Record-level authorization gate
//!
//! Every handler that touches another user's data funnels through
//! [`can_access`]. Identity resolution (who the caller is) happens in the
//! server's request extractor; this module only decides whether an already
//! resolved caller may see a subject's records.

use crate::db::models::Role;

/// Decide whether `caller` may access records belonging to `subject`.
///
/// Rules, evaluated in order:
/// 1. An admin role always passes.
/// 2. A caller accessing their own records always passes.
/// 3. A manager passes when they are the subject's manager.
/// 4. Otherwise fail.
pub fn can_access(
    role: Role,
    caller_id: &str,
    subject_id: &str,
    subject_manager_id: Option<&str>,
) -> bool {
    if role.is_admin() {
        return true;
    }
    if caller_id == subject_id {
        return true;
    }
    if role == Role::Manager && subject_manager_id == Some(caller_id) {
        return true;
    }
    false
}
