//! `qms order` command - Sales orders created from quotes

use chrono::NaiveDate;
use clap::{Subcommand, ValueEnum};
use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{
    open_project, parse_date, print_field, print_structured, refresh_short_ids, save_updated,
    today,
};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::loader;
use crate::entities::order::{OrderStatus, SalesOrder};

#[derive(Subcommand, Debug)]
pub enum OrderCommands {
    /// List sales orders
    List(ListArgs),

    /// Show an order with its items
    Show(ShowArgs),

    /// Move an order forward (in_production, delivered)
    Advance(AdvanceArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    Open,
    InProduction,
    Delivered,
    /// Not yet delivered
    Pending,
    All,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Only orders past their promised date
    #[arg(long)]
    pub late: bool,

    /// Show only count
    #[arg(long)]
    pub count: bool,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Order ID, number or short ID (ORD@N)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AdvanceArgs {
    /// Order ID, number or short ID (ORD@N)
    pub id: String,

    /// New status
    pub status: OrderStatus,

    /// Date of the change (default: today)
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// Run an order subcommand
pub fn run(cmd: OrderCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        OrderCommands::List(args) => run_list(args, global),
        OrderCommands::Show(args) => run_show(args, global),
        OrderCommands::Advance(args) => run_advance(args, global),
    }
}

const COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("number", "NUMBER", 10),
    ColumnDef::new("quote", "QUOTE", 10),
    ColumnDef::new("customer", "CUSTOMER", 24),
    ColumnDef::new("total", "TOTAL", 12),
    ColumnDef::new("ordered", "ORDERED", 12),
    ColumnDef::new("promised", "PROMISED", 12),
    ColumnDef::new("status", "STATUS", 14),
];

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let now = today();
    let mut orders: Vec<SalesOrder> = loader::load_records(&project)?;

    orders.retain(|o| {
        let status_ok = match args.status {
            StatusFilter::Open => o.status == OrderStatus::Open,
            StatusFilter::InProduction => o.status == OrderStatus::InProduction,
            StatusFilter::Delivered => o.status == OrderStatus::Delivered,
            StatusFilter::Pending => o.status != OrderStatus::Delivered,
            StatusFilter::All => true,
        };
        status_ok && (!args.late || o.is_late(now))
    });
    orders.sort_by(|a, b| a.number.cmp(&b.number).then(a.order_date.cmp(&b.order_date)));

    if args.count {
        println!("{}", orders.len());
        return Ok(());
    }

    if print_structured(&orders, global.format)? {
        return Ok(());
    }

    if orders.is_empty() {
        if !global.quiet {
            println!("No orders found.");
        }
        return Ok(());
    }

    let short_ids = refresh_short_ids(&project, &orders);
    let rows = orders.iter().map(|o| {
        let status = if o.is_late(now) {
            format!("{} (late)", o.status)
        } else {
            o.status.to_string()
        };
        TableRow::new(o.id.to_string(), &short_ids)
            .cell("number", CellValue::Number(o.number.clone()))
            .cell("quote", CellValue::Number(o.quote_number.clone()))
            .cell("customer", CellValue::Text(o.customer.clone()))
            .cell("total", CellValue::Money(o.total()))
            .cell("ordered", CellValue::Date(Some(o.order_date)))
            .cell("promised", CellValue::Date(o.promised_date))
            .cell("status", CellValue::State(status))
    });

    let mut formatter = TableFormatter::new(COLUMNS, "order", "ORD");
    if global.quiet {
        formatter = formatter.without_summary();
    }
    formatter.output(rows, global.format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, order): (_, SalesOrder) = loader::resolve(&project, &args.id)?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&order).into_diagnostic()?),
        OutputFormat::Yaml => print!("{}", std::fs::read_to_string(&path).into_diagnostic()?),
        OutputFormat::Id => println!("{}", order.id),
        _ => {
            println!(
                "{} {}",
                style(order.display_ref()).cyan().bold(),
                style(&order.title).bold()
            );
            println!("{}", "-".repeat(60));
            print_field("ID", Some(&order.id));
            print_field("Customer", Some(&order.customer));
            print_field("Contact", order.contact.as_ref());
            print_field(
                "Quote",
                Some(order.quote_number.clone().unwrap_or_else(|| order.quote_id.to_string())),
            );
            print_field("Status", Some(order.status));
            print_field("Ordered", Some(order.order_date));
            print_field("Promised", order.promised_date);
            print_field("Delivered", order.delivered_date);

            if !order.items.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["#", "Description", "Qty", "Unit price", "Subtotal"]);
                for (i, item) in order.items.iter().enumerate() {
                    builder.push_record([
                        (i + 1).to_string(),
                        item.description.clone(),
                        item.quantity.to_string(),
                        format!("{:.2}", item.unit_price),
                        format!("{:.2}", item.subtotal()),
                    ]);
                }
                println!();
                println!("{}", builder.build().with(Style::rounded()));
            }

            println!();
            println!(
                "{} {}",
                style("Total:").bold(),
                style(format!("{:.2}", order.total())).green().bold()
            );
        }
    }
    Ok(())
}

fn run_advance(args: AdvanceArgs, global: &GlobalOpts) -> Result<()> {
    let project = open_project(global)?;
    let (path, mut order): (_, SalesOrder) = loader::resolve(&project, &args.id)?;

    order
        .advance(args.status, args.date.unwrap_or_else(today))
        .map_err(|e| miette::miette!("{}", e))?;
    save_updated(&path, &order, &format!("Status {} for", args.status), global)
}
