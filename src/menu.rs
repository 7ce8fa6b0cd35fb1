//! Static menu catalog and the fixed phrases the bot speaks
//!
//! Menus are plain data looked up by name. Which name belongs to which
//! conversation node is decided by `ConvState::menu_name`.

use std::fmt::Write;

/// An immutable menu: a title, an optional informational body, and
/// ordered option labels numbered from 1 when rendered.
#[derive(Debug, PartialEq, Eq)]
pub struct Menu {
    pub name: &'static str,
    pub title: &'static str,
    pub body: Option<&'static str>,
    pub options: &'static [&'static str],
}

impl Menu {
    /// Render the menu as chat text.
    ///
    /// ```text
    /// *Title*
    ///
    /// optional body
    ///
    /// 1. first option
    /// 2. second option
    /// ```
    pub fn render(&self) -> String {
        let mut out = format!("*{}*\n", self.title);
        if let Some(body) = self.body {
            out.push('\n');
            out.push_str(body);
            out.push('\n');
        }
        out.push('\n');
        for (index, label) in self.options.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", index + 1, label);
        }
        out.truncate(out.trim_end().len());
        out
    }
}

pub static MAIN: Menu = Menu {
    name: "main",
    title: "Menu Utama",
    body: None,
    options: &[
        "Informasi",
        "Hubungi Petugas",
        "Akhiri Percakapan",
        "Menu Dummy",
        "Produk",
    ],
};

pub static INFO: Menu = Menu {
    name: "info",
    title: "Informasi",
    body: None,
    options: &["PDRB", "Kembali ke Menu Utama"],
};

pub static PDRB: Menu = Menu {
    name: "pdrb",
    title: "PDRB",
    body: Some(
        "Produk Domestik Regional Bruto (PDRB) adalah jumlah nilai tambah bruto \
         seluruh barang dan jasa yang dihasilkan oleh unit usaha di suatu wilayah \
         dalam satu periode tertentu.",
    ),
    options: &["Kembali ke Informasi"],
};

pub static DUMMY_MENU: Menu = Menu {
    name: "dummy_menu",
    title: "Menu Dummy",
    body: None,
    options: &["Submenu Dummy 1", "Kembali ke Menu Utama"],
};

pub static DUMMY_SUBMENU_1: Menu = Menu {
    name: "dummy_submenu_1",
    title: "Submenu Dummy 1",
    body: Some("Ini adalah isi dari Submenu Dummy 1."),
    options: &["Kembali ke Menu Dummy"],
};

pub static PRODUK: Menu = Menu {
    name: "produk",
    title: "Produk",
    body: None,
    options: &["Produk 1", "Produk 2", "Produk 3", "Kembali ke Menu Utama"],
};

pub static PRODUK_1: Menu = Menu {
    name: "produk_1",
    title: "Produk 1",
    body: Some("Informasi lengkap mengenai Produk 1 akan segera tersedia."),
    options: &["Kembali ke Produk"],
};

/// Every menu in the catalog, in tree order.
pub static CATALOG: [&Menu; 7] = [
    &MAIN,
    &INFO,
    &PDRB,
    &DUMMY_MENU,
    &DUMMY_SUBMENU_1,
    &PRODUK,
    &PRODUK_1,
];

/// Look up a menu by its catalog name.
pub fn by_name(name: &str) -> Option<&'static Menu> {
    CATALOG.iter().copied().find(|menu| menu.name == name)
}

pub const WELCOME: &str = "Selamat datang! Silakan pilih menu dengan membalas angka pilihan Anda.";

pub const INVALID_CHOICE: &str = "Pilihan tidak valid. Silakan pilih salah satu opsi berikut.";

pub const HANDOFF_WAIT: &str =
    "Mohon tunggu, petugas kami akan segera membalas pesan Anda. \
     Ketik \"terima kasih\" jika sudah selesai.";

/// Phrase that ends a human-handoff session, compared case-insensitively.
pub const HANDOFF_END_PHRASE: &str = "terima kasih";

pub const BOT_RESUMED: &str = "Sesi dengan petugas telah selesai. Bot aktif kembali.";

pub const GOODBYE: &str = "Terima kasih telah menghubungi kami. Sampai jumpa!";

pub const INACTIVITY_NOTICE: &str =
    "Percakapan diakhiri karena tidak ada aktivitas. Kirim pesan apa saja untuk memulai lagi.";

/// Appended to every bot reply sent through the suffixed path.
pub const BOT_SUFFIX: &str = "\n\n_Pesan ini dikirim otomatis oleh bot._";
