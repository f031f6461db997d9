use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "roster", version, about = "Browse and edit a remote user roster", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Keep the page one snapshot in memory only
    #[arg(long, global = true)]
    pub no_persist: bool,

    /// Print users as JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List users, one page at a time
    #[command(alias = "ls")]
    List {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: usize,

        /// Load every page
        #[arg(short, long, conflicts_with = "pages")]
        all: bool,
    },

    /// Search users by first or last name
    Search {
        query: String,

        /// Exclude these ids from the results
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<i64>,
    },

    /// Show one user
    Show { id: i64 },

    /// Create a user
    Create {
        #[command(flatten)]
        fields: UserFields,
    },

    /// Change some fields of a user
    Update {
        id: i64,

        #[command(flatten)]
        fields: UserFields,
    },

    /// Delete a user
    #[command(alias = "rm")]
    Delete { id: i64 },

    /// Inspect or clear the persisted first page
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show what is persisted
    Status,
    /// Remove the persisted first page
    Clear,
}

#[derive(Args, Debug, Default)]
pub struct UserFields {
    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub avatar: Option<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub birth_date: Option<String>,

    #[arg(long, requires = "graduation_year")]
    pub university: Option<String>,

    #[arg(long, requires = "university")]
    pub graduation_year: Option<i32>,

    #[arg(long)]
    pub company: Option<String>,

    #[arg(long, requires = "company")]
    pub responsibilities: Option<String>,
}
