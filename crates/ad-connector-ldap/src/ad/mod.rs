//! Active Directory specific modules
//!
//! Request builders per object type on top of the generic directory traits:
//! - computer, group, organizational unit and user attribute sets
//! - group membership changes
//! - unicodePwd encoding
//! - rename / move helpers
//! - the extended-DN search control

pub mod computer;
pub mod controls;
pub mod group;
pub mod modify;
pub mod orgunit;
pub mod password;
pub mod user;

// Re-export key types
pub use computer::{computer_attributes, computer_container, computer_dn, computer_filter};
pub use controls::{extended_dn_control, ExtendedDnFormat, EXTENDED_DN_OID};
pub use group::{
    add_member, collect_members, compute_membership_diff, default_group_container,
    group_attributes, group_dn, group_members, is_member, remove_member, GroupScope,
    MembershipDiff,
};
pub use modify::{move_entry, rename_entry, renamed_dn, replace_attribute_delta, update_entry};
pub use orgunit::{orgunit_attributes, orgunit_dn};
pub use password::{build_password_modify, encode_ad_password, validate_password_connection};
pub use user::{activation_delta, default_user_container, user_dn, user_filter, UserSpec};
