//! Command handlers for the roster CLI.
//!
//! `App` owns one `RosterPage` for the lifetime of the process and drives it
//! the way the roster screen does: load pages, publish edit/delete requests
//! through the selection channel, then submit through the coordinator.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use roster_core::cache::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
use roster_core::models::parse_date;
use roster_core::utils::{format_optional, truncate_string};
use roster_core::{
    Config, Education, FetchOutcome, NewUser, RosterContext, RosterPage, User, UserChanges,
    UserPicker, Work,
};

use crate::cli::{CacheAction, UserFields};

/// Column widths for the user table
const NAME_WIDTH: usize = 16;
const EMAIL_WIDTH: usize = 32;

pub struct App {
    config: Config,
    page: RosterPage,
    json: bool,
}

impl App {
    pub fn new(config: Config, no_persist: bool, json: bool) -> Result<Self> {
        let mut ctx = RosterContext::from_config(&config)?;
        if no_persist {
            ctx = ctx.with_store(Arc::new(MemorySnapshotStore::new()));
        }
        debug!(base_url = %config.api_base_url, no_persist, "App created");
        Ok(Self {
            config,
            page: RosterPage::new(ctx),
            json,
        })
    }

    // =========================================================================
    // Reading
    // =========================================================================

    pub async fn list(&self, pages: usize, all: bool) -> Result<()> {
        let limit = if all { usize::MAX } else { pages.max(1) };
        self.page.load_pages(limit).await?;
        self.print_users(&self.page.users())?;

        if !self.json {
            let total = self
                .page
                .cache()
                .total_pages()
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".to_string());
            let more = if self.page.cache().has_next_page() { " (more available)" } else { "" };
            println!("\npage {} of {}{}", self.page.cache().page_count(), total, more);
        }
        Ok(())
    }

    pub async fn search(&self, query: &str, exclude: &[i64]) -> Result<()> {
        self.page.load_pages(usize::MAX).await?;
        let users = self.page.users();

        let mut picker = UserPicker::new().with_disabled(exclude.iter().copied());
        picker.set_query(query);
        let matches = search_matches(&picker, &users);

        if self.json {
            let rows = matches
                .iter()
                .map(|(user, disabled)| -> Result<serde_json::Value> {
                    let mut row = serde_json::to_value(user)?;
                    if let Some(obj) = row.as_object_mut() {
                        obj.insert("disabled".to_string(), (*disabled).into());
                    }
                    Ok(row)
                })
                .collect::<Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(());
        }

        self.print_table(matches.iter().map(|(user, disabled)| (user, *disabled)));
        if matches.iter().any(|(_, disabled)| *disabled) {
            println!("\n* excluded, cannot be picked");
        }
        if picker.offers_add(&users) {
            println!("\nNobody is named {:?}; `roster create` adds a new user.", query);
        }
        Ok(())
    }

    pub async fn show(&self, id: i64) -> Result<()> {
        let user = self.find_user(id).await?;
        println!("{}", serde_json::to_string_pretty(&user)?);
        Ok(())
    }

    /// Walk the roster until the user turns up.
    async fn find_user(&self, id: i64) -> Result<User> {
        loop {
            if let Some(user) = self.page.cache().find(id) {
                return Ok(user);
            }
            if !self.page.cache().has_next_page() {
                bail!("User {} not found in roster", id);
            }
            if let FetchOutcome::Skipped(_) | FetchOutcome::Discarded = self.page.load_more().await? {
                bail!("User {} not found in roster", id);
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub async fn create(&self, fields: UserFields) -> Result<()> {
        let user = new_user_from(fields)?;
        let created = self.page.coordinator().create(user).await?;
        println!("Created user {} ({})", created.id, created.full_name());
        Ok(())
    }

    pub async fn update(&self, id: i64, fields: UserFields) -> Result<()> {
        let changes = changes_from(fields)?;
        if changes.is_empty() {
            bail!("Nothing to update; pass at least one field");
        }

        let target = self.find_user(id).await?;
        self.page.request_edit(target);
        let updated = self.page.submit_edit(changes).await?;
        println!("Updated user {} ({})", updated.id, updated.full_name());
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let target = self.find_user(id).await?;
        let name = target.full_name();
        self.page.request_delete(target);
        self.page.confirm_delete().await?;
        println!("Deleted user {} ({})", id, name);
        Ok(())
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    pub fn cache(&self, action: CacheAction) -> Result<()> {
        let store = FileSnapshotStore::new(&self.config.cache_dir()?);
        match action {
            CacheAction::Status => match store.read() {
                Ok(Some(cached)) => {
                    println!("{}", store.path().display());
                    println!(
                        "page {} of {}, {} users, saved {}",
                        cached.data.page,
                        cached.data.total_pages,
                        cached.data.data.len(),
                        cached.age_display()
                    );
                }
                Ok(None) => println!("No persisted snapshot"),
                Err(e) => println!("Persisted snapshot unreadable: {}", e),
            },
            CacheAction::Clear => {
                store.clear().context("Failed to clear persisted snapshot")?;
                println!("Persisted snapshot cleared");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Output
    // =========================================================================

    fn print_users(&self, users: &[User]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(users)?);
        } else {
            self.print_table(users.iter().map(|user| (user, false)));
        }
        Ok(())
    }

    /// One row per user; marked rows get a `*` after the id.
    fn print_table<'a>(&self, rows: impl Iterator<Item = (&'a User, bool)>) {
        println!(
            "{:>6}  {:<nw$}  {:<nw$}  {:<ew$}  {}",
            "ID",
            "First name",
            "Last name",
            "Email",
            "Born",
            nw = NAME_WIDTH,
            ew = EMAIL_WIDTH
        );
        for (user, marked) in rows {
            println!(
                "{:>5}{}  {:<nw$}  {:<nw$}  {:<ew$}  {}",
                user.id,
                if marked { "*" } else { " " },
                truncate_string(&user.first_name, NAME_WIDTH),
                truncate_string(&user.last_name, NAME_WIDTH),
                truncate_string(&user.email, EMAIL_WIDTH),
                format_optional(user.birth_date, "-"),
                nw = NAME_WIDTH,
                ew = EMAIL_WIDTH
            );
        }
    }
}

/// Users the picker lists for its query, each flagged when it cannot be
/// picked. Disabled users stay in the list.
fn search_matches(picker: &UserPicker, users: &[User]) -> Vec<(User, bool)> {
    picker
        .filter(users)
        .into_iter()
        .map(|user| (user.clone(), picker.is_disabled(user.id)))
        .collect()
}

fn birth_date(fields: &UserFields) -> Result<Option<NaiveDate>> {
    fields
        .birth_date
        .as_deref()
        .map(|s| parse_date(s).ok_or_else(|| anyhow!("Invalid birth date {:?}, expected YYYY-MM-DD", s)))
        .transpose()
}

fn education(fields: &UserFields) -> Option<Education> {
    match (&fields.university, fields.graduation_year) {
        (Some(university), Some(year)) => Some(Education {
            university: university.clone(),
            graduation_year: year,
        }),
        _ => None,
    }
}

fn work(fields: &UserFields) -> Option<Work> {
    fields.company.as_ref().map(|company| Work {
        company: company.clone(),
        responsibilities: fields.responsibilities.clone().unwrap_or_default(),
    })
}

fn new_user_from(fields: UserFields) -> Result<NewUser> {
    Ok(NewUser {
        birth_date: birth_date(&fields)?,
        education: education(&fields),
        work: work(&fields),
        first_name: fields.first_name.unwrap_or_default(),
        last_name: fields.last_name.unwrap_or_default(),
        email: fields.email.unwrap_or_default(),
        avatar: fields.avatar,
    })
}

fn changes_from(fields: UserFields) -> Result<UserChanges> {
    Ok(UserChanges {
        birth_date: birth_date(&fields)?,
        education: education(&fields),
        work: work(&fields),
        first_name: fields.first_name,
        last_name: fields.last_name,
        email: fields.email,
        avatar: fields.avatar,
    })
}
