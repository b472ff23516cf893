//! `qms quote` command - Sales quotations

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    allocate_number, open_in_editor, open_project, parse_date, parse_finite, print_field,
    print_structured, refresh_short_ids, save_new, save_updated, today,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::loader;
use crate::core::numbering::SequenceFamily;
use crate::core::Config;
use crate::entities::quote::{Quote, QuoteItem, QuoteStatus, DEFAULT_VALIDITY_DAYS};

#[derive(Subcommand, Debug)]
pub enum QuoteCommands {
    /// List quotes
    List(ListArgs),

    /// Create a new quote
    New(NewArgs),

    /// Show a quote with its items
    Show(ShowArgs),

    /// Edit a quote in your editor
    Edit(EditArgs),

    /// Add a line item
    Item(ItemArgs),

    /// Change the quote status (draft, sent, approved, rejected)
    Status(StatusArgs),

    /// Convert the quote into a sales order
    Convert(ConvertArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Draft,
    Sent,
    Approved,
    Rejected,
    Converted,
    /// Draft, sent or approved
    Open,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Filter by customer (substring, case-insensitive)
    #[arg(long, short = 'c')]
    pub customer: Option<String>,

    /// Only quotes past their validity
    #[arg(long)]
    pub expired: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// What is being quoted
    #[arg(long, short = 't')]
    pub title: String,

    /// Customer name
    #[arg(long, short = 'c')]
    pub customer: String,

    /// Contact at the customer
    #[arg(long)]
    pub contact: Option<String>,

    /// Days the quote stays valid
    #[arg(long, default_value_t = DEFAULT_VALIDITY_DAYS)]
    pub validity: u32,

    /// Quote date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Open in editor after creation
    #[arg(long, short = 'e')]
    pub edit: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Quote ID, number or short ID (QUOT@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Quote ID, number or short ID (QUOT@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ItemArgs {
    /// Quote ID, number or short ID (QUOT@N)
    pub id: String,

    /// Item description
    #[arg(long, short = 'd')]
    pub description: String,

    /// Quantity
    #[arg(long, value_parser = parse_finite)]
    pub qty: f64,

    /// Unit price
    #[arg(long, short = 'p', value_parser = parse_finite)]
    pub price: f64,

    /// Lead time in days
    #[arg(long, short = 'l', default_value_t = 0)]
    pub lead: u32,

    /// Unit of measure (pc, kg, m...)
    #[arg(long, short = 'u')]
    pub unit: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Quote ID, number or short ID (QUOT@N)
    pub id: String,

    /// New status
    pub status: QuoteStatus,
}

#[derive(clap::Args, Debug)]
pub struct ConvertArgs {
    /// Quote ID, number or short ID (QUOT@N)
    pub id: String,

    /// Order date (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// Run a quote subcommand
pub fn run(cmd: QuoteCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        QuoteCommands::List(args) => run_list(args, global),
        QuoteCommands::New(args) => run_new(args, global),
        QuoteCommands::Show(args) => run_show(args, global),
        QuoteCommands::Edit(args) => run_edit(args, global),
        QuoteCommands::Item(args) => run_item(args, global),
        QuoteCommands::Status(args) => run_status(args, global),
        QuoteCommands::Convert(args) => run_convert(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 10),
    ColumnDef::new("title", "TITLE", 30),
    ColumnDef::new("customer", "CUSTOMER", 22),
    ColumnDef::new("total", "TOTAL", 12),
    ColumnDef::new("lead", "LEAD", 5),
    ColumnDef::new("valid", "VALID UNTIL", 12),
    ColumnDef::new("status", "STATUS", 10),
];

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let now = today();
    let mut quotes: Vec<Quote> = loader::load_records(&project)?;

    let customer = args.customer.as_ref().map(|c| c.to_lowercase());
    quotes.retain(|q| {
        let status_ok = match args.status {
            StatusFilter::Draft => q.status == QuoteStatus::Draft,
            StatusFilter::Sent => q.status == QuoteStatus::Sent,
            StatusFilter::Approved => q.status == QuoteStatus::Approved,
            StatusFilter::Rejected => q.status == QuoteStatus::Rejected,
            StatusFilter::Converted => q.status == QuoteStatus::Converted,
            StatusFilter::Open => matches!(
                q.status,
                QuoteStatus::Draft | QuoteStatus::Sent | QuoteStatus::Approved
            ),
            StatusFilter::All => true,
        };
        let customer_ok = customer
            .as_ref()
            .map_or(true, |c| q.customer.to_lowercase().contains(c));
        status_ok && customer_ok && (!args.expired || q.is_expired(now))
    });
    quotes.sort_by(|a, b| a.number.cmp(&b.number).then(a.quote_date.cmp(&b.quote_date)));

    if args.count {
        println!("{}", quotes.len());
        return Ok(());
    }

    if print_structured(&quotes, global.format)? {
        return Ok(());
    }

    if quotes.is_empty() {
        if !global.quiet {
            println!("No quotes found.");
        }
        return Ok(());
    }

    let short_ids = refresh_short_ids(&project, &quotes);
    let rows = quotes.iter().map(|q| {
        TableRow::new(q.id.to_string(), &short_ids)
            .cell("number", CellValue::Number(q.number.clone()))
            .cell("title", CellValue::Text(q.title.clone()))
            .cell("customer", CellValue::Text(q.customer.clone()))
            .cell("total", CellValue::Money(q.total()))
            .cell("lead", CellValue::Count(i64::from(q.lead_time_days())))
            .cell("valid", CellValue::Date(q.valid_until()))
            .cell("status", CellValue::State(q.status.to_string()))
    });

    let mut formatter = TableFormatter::new(COLUMNS, "quote", "QUOT");
    if global.quiet {
        formatter = formatter.without_summary();
    }
    formatter.output(rows, global.format);
    Ok(())
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);

    let mut quote = Quote::new(
        args.title,
        args.customer,
        args.date.unwrap_or_else(today),
        config.author(),
    );
    quote.contact = args.contact;
    quote.validity_days = args.validity;
    quote.number = Some(allocate_number(&project, &config, SequenceFamily::Quote)?);

    let path = save_new(&project, &quote, global)?;
    if args.edit {
        open_in_editor(&config, &path)?;
    }
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, quote): (_, Quote) = loader::resolve(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&quote).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", std::fs::read_to_string(&path).into_diagnostic()?),
        OutputFormat::Id => println!("{}", quote.id),
        _ => {
            println!(
                "{} {}",
                style(quote.display_ref()).cyan().bold(),
                style(&quote.title).bold()
            );
            println!("{}", "-".repeat(60));
            print_field("ID", Some(&quote.id));
            print_field("Customer", Some(&quote.customer));
            print_field("Contact", quote.contact.as_ref());
            print_field("Status", Some(quote.status));
            print_field("Date", Some(quote.quote_date));
            print_field("Valid until", quote.valid_until());
            print_field("Order", quote.order.as_ref());

            if !quote.items.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["#", "Description", "Qty", "Unit price", "Subtotal", "Lead (d)"]);
                for (i, item) in quote.items.iter().enumerate() {
                    let qty = match &item.unit {
                        Some(unit) => format!("{} {}", item.quantity, unit),
                        None => item.quantity.to_string(),
                    };
                    builder.push_record([
                        (i + 1).to_string(),
                        item.description.clone(),
                        qty,
                        format!("{:.2}", item.unit_price),
                        format!("{:.2}", item.subtotal()),
                        item.lead_time_days.to_string(),
                    ]);
                }
                println!();
                println!("{}", builder.build().with(Style::rounded()));
            }

            println!();
            println!(
                "{} {}   {} {} days",
                style("Total:").bold(),
                style(format!("{:.2}", quote.total())).green().bold(),
                style("Lead time:").bold(),
                quote.lead_time_days()
            );
        }
    }
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, _): (_, Quote) = loader::resolve(&project, &args.id)?;
    open_in_editor(&config, &path)
}

fn run_item(args: ItemArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, mut quote): (_, Quote) = loader::resolve(&project, &args.id)?;

    if quote.status == QuoteStatus::Converted {
        return Err(miette::miette!(
            "{} is converted; its items can no longer change",
            quote.display_ref()
        ));
    }
    if args.qty <= 0.0 {
        return Err(miette::miette!("Quantity must be greater than zero"));
    }
    if args.price < 0.0 {
        return Err(miette::miette!("Unit price cannot be negative"));
    }

    quote.add_item(QuoteItem {
        description: args.description,
        quantity: args.qty,
        unit_price: args.price,
        lead_time_days: args.lead,
        unit: args.unit,
    });
    quote.revision += 1;
    save_updated(&path, &quote, "Added item to", global)?;

    if !global.quiet && global.format != OutputFormat::Id {
        println!("   total now {:.2}", quote.total());
    }
    Ok(())
}

fn run_status(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, mut quote): (_, Quote) = loader::resolve(&project, &args.id)?;

    quote.set_status(args.status).map_err(|e| miette::miette!("{}", e))?;
    save_updated(&path, &quote, &format!("Status {} for", args.status), global)
}

fn run_convert(args: ConvertArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let config = Config::load_for(&project);
    let (path, mut quote): (_, Quote) = loader::resolve(&project, &args.id)?;

    let order_number = allocate_number(&project, &config, SequenceFamily::Order)?;
    let order = quote
        .convert(
            Some(order_number),
            args.date.unwrap_or_else(today),
            config.author(),
        )
        .map_err(|e| miette::miette!("{}", e))?;

    save_new(&project, &order, global)?;
    save_updated(&path, &quote, "Converted", global)?;

    if !global.quiet && global.format != OutputFormat::Id {
        if let Some(promised) = order.promised_date {
            println!("   promised for {}", style(promised).yellow());
        }
    }
    Ok(())
}
