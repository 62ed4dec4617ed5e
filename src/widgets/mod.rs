pub mod connection_table;
pub mod detail_pane;
pub mod system_readout;
pub mod filter_selector;
pub mod process_popup;

pub use self::connection_table::ConnectionTableWidget;
pub use self::detail_pane::DetailPaneWidget;
pub use self::system_readout::SystemReadoutWidget;
pub use self::filter_selector::FilterWidget;
pub use self::process_popup::ProcessPopupWidget;
