//! Composite objects built from containers: dialogs, cards, sidebar panels
//! and tables.
//!
//! Each component owns a [`crate::Container`] and implements
//! [`crate::Locatable`], so every find helper of the container is available
//! on it as well.

mod card;
mod data_table;
mod modal;
mod sidebar;

pub use card::{
    named_card_xpath, nth_card_xpath, AccessLevel, CardType, DataResourceCard, WorkspaceCard,
    RESOURCE_CARD_WAIT_MS, RESOURCE_CARD_XPATH, WORKSPACE_CARD_WAIT_MS, WORKSPACE_CARD_XPATH,
};
pub use data_table::{DataTable, TABLE_XPATH};
pub use modal::{react_modal_xpath, text_lines_xpath, Dialog, Modal, ReactModal, DIALOG_XPATH};
pub use sidebar::{
    sidebar_icon_xpath, GenomicExtractionsSidebar, Sidebar, EXTRACTION_SPINNER_XPATH, SIDEBAR_XPATH,
};
