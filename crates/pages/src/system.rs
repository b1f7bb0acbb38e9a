use switchboard_auth::Role;

/// Built-in pages. They cannot be deleted, renamed or reordered, and always
/// occupy the trailing menu slots in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SystemPage {
    Dashboard,
    UserProfile,
    EditPage,
    CodeSnippets,
    PagesManager,
    AdminPanel,
}

impl SystemPage {
    pub const ALL: [SystemPage; 6] = [
        SystemPage::Dashboard,
        SystemPage::UserProfile,
        SystemPage::EditPage,
        SystemPage::CodeSnippets,
        SystemPage::PagesManager,
        SystemPage::AdminPanel,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::UserProfile => "User Profile",
            Self::EditPage => "Edit Page",
            Self::CodeSnippets => "Code Snippets",
            Self::PagesManager => "Pages Manager",
            Self::AdminPanel => "Admin Panel",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|page| page.name() == name)
    }

    /// Role seeded for the page on first run.
    pub fn default_role(self) -> Role {
        match self {
            Self::Dashboard | Self::UserProfile => Role::base(),
            _ => Role::admin(),
        }
    }

    pub fn default_icon(self) -> &'static str {
        match self {
            Self::Dashboard => "📊",
            Self::UserProfile => "👤",
            Self::EditPage => "✏️",
            Self::CodeSnippets => "💻",
            Self::PagesManager => "🗂️",
            Self::AdminPanel => "⚙️",
        }
    }

    /// Zero-based position among the pinned trailing slots.
    pub fn pin_rank(self) -> usize {
        self as usize
    }
}
