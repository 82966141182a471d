//! `quarry items` commands

use crate::item::{Item, ITEM};
use clap::{Args, Subcommand};
use quarry_core::query::Statement;
use quarry_core::{col, Predicate, QuerySpec};
use quarry_engine::{Database, LiveQuery, LiveState};

#[derive(Debug, Args)]
pub struct ItemsArgs {
    #[command(subcommand)]
    pub command: ItemsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ItemsCommand {
    /// Insert an item and print its id
    Add(AddArgs),
    /// Print matching items, one per line
    List(ListArgs),
    /// Print the number of matching items
    Count(FilterArgs),
    /// Delete an item by id
    Delete(DeleteArgs),
    /// Print the matching items every time the table changes
    Watch(WatchArgs),
}

#[derive(Debug, Args)]
pub struct AddArgs {
    pub name: String,

    #[arg(long, short, default_value_t = 1)]
    pub quantity: i64,
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// SQL LIKE pattern on the name
    #[arg(long)]
    pub name_like: Option<String>,

    #[arg(long)]
    pub min_quantity: Option<i64>,

    /// Print the compiled SQL and bindings instead of running it
    #[arg(long)]
    pub explain: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[arg(long)]
    pub limit: Option<u64>,

    #[arg(long)]
    pub offset: Option<u64>,

    /// Newest first instead of by name
    #[arg(long)]
    pub newest: bool,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Stop after printing this many results
    #[arg(long)]
    pub updates: Option<usize>,
}

impl ItemsArgs {
    pub fn is_explain(&self) -> bool {
        match &self.command {
            ItemsCommand::List(args) => args.filter.explain,
            ItemsCommand::Count(args) => args.explain,
            _ => false,
        }
    }
}

impl FilterArgs {
    fn spec(&self) -> QuerySpec {
        let mut predicates = Vec::new();
        if let Some(pattern) = &self.name_like {
            predicates.push(col("name").like(pattern.as_str()));
        }
        if let Some(min) = self.min_quantity {
            predicates.push(col("quantity").ge(min));
        }
        if predicates.is_empty() {
            QuerySpec::new()
        } else {
            QuerySpec::matching(Predicate::all(predicates))
        }
    }
}

impl ListArgs {
    fn spec(&self) -> QuerySpec {
        let mut spec = self.filter.spec();
        spec = if self.newest {
            spec.order_desc("created_at").order_asc("name")
        } else {
            spec.order_asc("name").order_asc("id")
        };
        if let Some(limit) = self.limit {
            spec = spec.limit(limit);
        }
        if let Some(offset) = self.offset {
            spec = spec.offset(offset);
        }
        spec
    }
}

pub async fn execute(db: &Database, args: ItemsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let repo = db.repository::<Item>();
    repo.create_table().await?;

    match args.command {
        ItemsCommand::Add(args) => {
            let item = repo.insert(Item::new(args.name, args.quantity)).await?;
            println!("{}", item.id);
        }
        ItemsCommand::List(args) => {
            for item in repo.find_all(&args.spec()).await? {
                println!("{}", format_item(&item));
            }
        }
        ItemsCommand::Count(args) => {
            println!("{}", repo.count(&args.spec()).await?);
        }
        ItemsCommand::Delete(args) => {
            let deleted = repo.delete(args.id).await?;
            if deleted == 0 {
                return Err(format!("no item with id {}", args.id).into());
            }
            println!("deleted {}", args.id);
        }
        ItemsCommand::Watch(args) => {
            let spec = args.filter.spec().order_asc("name");
            let live = LiveQuery::list(&repo, spec);
            let mut changes = live.changes();
            let mut printed = 0;

            loop {
                let state = changes.borrow_and_update().clone();
                match state {
                    LiveState::Ready(items) => {
                        println!("-- {} item(s)", items.len());
                        for item in &items {
                            println!("{}", format_item(item));
                        }
                        printed += 1;
                    }
                    LiveState::Failed(err) => eprintln!("watch: {}", err),
                    LiveState::Pending => {}
                    LiveState::Closed => break,
                }
                if args.updates.is_some_and(|limit| printed >= limit) {
                    break;
                }

                tokio::select! {
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            live.close();
        }
    }
    Ok(())
}

/// Print the statement a list or count would run
pub fn explain(args: ItemsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let table = ITEM.table_name();
    let stmt = match &args.command {
        ItemsCommand::List(list) => list.spec().select_statement(&table, &ITEM)?,
        ItemsCommand::Count(filter) => filter.spec().count_statement(&table, &ITEM)?,
        _ => return Err("--explain applies to list and count".into()),
    };
    print!("{}", format_statement(&stmt));
    Ok(())
}

fn format_item(item: &Item) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        item.id,
        item.name,
        item.quantity,
        item.created_at.to_rfc3339()
    )
}

fn format_statement(stmt: &Statement) -> String {
    let mut out = format!("{}\n", stmt.sql);
    for (index, value) in stmt.bindings.iter().enumerate() {
        out.push_str(&format!("  ?{} = {}\n", index + 1, value));
    }
    out
}
