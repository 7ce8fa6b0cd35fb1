//! Conversation state types and the routing table

use crate::menu::{self, Menu};

/// Menu node a conversation is currently sitting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConvState {
    #[default]
    Main,
    Info,
    Pdrb,
    DummyMenu,
    DummySubmenu1,
    Produk,
    Produk1,
}

/// Outcome of a recognized menu choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Move to another node and show its menu
    Goto(ConvState),
    /// Keep the node and show its menu again (placeholder leaves)
    Stay,
    /// Hand the conversation over to a human agent
    Handoff,
    /// End the conversation
    End,
}

/// Every `(node, input) -> route` pair the bot understands.
///
/// Anything not listed here is an invalid choice for that node.
pub static ROUTES: &[(ConvState, &str, Route)] = &[
    (ConvState::Main, "1", Route::Goto(ConvState::Info)),
    (ConvState::Main, "2", Route::Handoff),
    (ConvState::Main, "3", Route::End),
    (ConvState::Main, "4", Route::Goto(ConvState::DummyMenu)),
    (ConvState::Main, "5", Route::Goto(ConvState::Produk)),
    (ConvState::Info, "1", Route::Goto(ConvState::Pdrb)),
    (ConvState::Info, "2", Route::Goto(ConvState::Main)),
    (ConvState::Pdrb, "1", Route::Goto(ConvState::Info)),
    (ConvState::DummyMenu, "1", Route::Goto(ConvState::DummySubmenu1)),
    (ConvState::DummyMenu, "2", Route::Goto(ConvState::Main)),
    (ConvState::DummySubmenu1, "1", Route::Goto(ConvState::DummyMenu)),
    (ConvState::Produk, "1", Route::Goto(ConvState::Produk1)),
    (ConvState::Produk, "2", Route::Stay),
    (ConvState::Produk, "3", Route::Stay),
    (ConvState::Produk, "4", Route::Goto(ConvState::Main)),
    (ConvState::Produk1, "1", Route::Goto(ConvState::Produk)),
];

impl ConvState {
    #[allow(dead_code)] // Enumerated by tests
    pub const ALL: [ConvState; 7] = [
        ConvState::Main,
        ConvState::Info,
        ConvState::Pdrb,
        ConvState::DummyMenu,
        ConvState::DummySubmenu1,
        ConvState::Produk,
        ConvState::Produk1,
    ];

    /// Look up the route for an already-trimmed input.
    pub fn route(self, input: &str) -> Option<Route> {
        ROUTES
            .iter()
            .find(|(state, key, _)| *state == self && *key == input)
            .map(|(_, _, route)| *route)
    }

    /// Inputs this node recognizes, in table order
    #[allow(dead_code)]
    pub fn recognized_inputs(self) -> impl Iterator<Item = &'static str> {
        ROUTES
            .iter()
            .filter(move |(state, _, _)| *state == self)
            .map(|(_, key, _)| *key)
    }

    /// Catalog name of the menu shown at this node
    pub fn menu_name(self) -> &'static str {
        match self {
            ConvState::Main => "main",
            ConvState::Info => "info",
            ConvState::Pdrb => "pdrb",
            ConvState::DummyMenu => "dummy_menu",
            ConvState::DummySubmenu1 => "dummy_submenu_1",
            ConvState::Produk => "produk",
            ConvState::Produk1 => "produk_1",
        }
    }

    /// This node's menu, resolved from the catalog by name
    pub fn menu(self) -> &'static Menu {
        menu::by_name(self.menu_name()).unwrap_or(&menu::MAIN)
    }
}

/// Per-counterparty conversation record
///
/// The inactivity timer is not stored here; `ExpiryScheduler` keys it by
/// the same counterparty id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conversation {
    pub state: ConvState,
    /// While set, menu routing is suspended until the release phrase arrives
    pub human_handoff_active: bool,
}
