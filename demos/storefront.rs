//! Simulated storefront traffic flowing through every service aggregator.
//!
//! Run with:
//! ```bash
//! cargo run --example storefront --features demo -- --help
//! RUST_LOG=riepilogo=debug cargo run --example storefront --features demo -- --format tracing
//! ```

use clap::{Parser, ValueEnum};
use riepilogo::domain::{Address, Money};
use riepilogo::prometheus::StatsExporter;
use riepilogo::services::ad::AdAggregator;
use riepilogo::services::cart::{CartAggregator, CartOperation};
use riepilogo::services::catalog::{CatalogAggregator, OperationStatus};
use riepilogo::services::checkout::{CheckoutAggregator, Order, OrderStatus};
use riepilogo::services::currency::CurrencyAggregator;
use riepilogo::services::email::EmailAggregator;
use riepilogo::services::payment::{PaymentAggregator, Transaction};
use riepilogo::services::recommendation::RecommendationAggregator;
use riepilogo::services::shipping::ShippingAggregator;
use riepilogo::services::storefront::StorefrontAggregator;
use riepilogo::services::Service;
use riepilogo::sink::table::{TableSink, TableStyle};
use riepilogo::sink::{JsonSink, Sink, TracingSink};
use riepilogo::StatsSnapshot;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Where records go.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One tracing event per record
    Tracing,
    /// JSON lines on stdout
    Json,
    /// One table per record on stdout
    Table,
}

/// Table style selection.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum StyleChoice {
    Ascii,
    #[default]
    Rounded,
    Sharp,
    Modern,
    Markdown,
    Blank,
}

impl From<StyleChoice> for TableStyle {
    fn from(choice: StyleChoice) -> Self {
        match choice {
            StyleChoice::Ascii => TableStyle::Ascii,
            StyleChoice::Rounded => TableStyle::Rounded,
            StyleChoice::Sharp => TableStyle::Sharp,
            StyleChoice::Modern => TableStyle::Modern,
            StyleChoice::Markdown => TableStyle::Markdown,
            StyleChoice::Blank => TableStyle::Blank,
        }
    }
}

/// Storefront demo for riepilogo business-metrics aggregators.
///
/// Spawns shopper threads that drive every service, with windows shortened
/// so that summaries show up within a few seconds.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output format for records
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Table style (for table format)
    #[arg(short, long, value_enum, default_value = "rounded")]
    style: StyleChoice,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Number of shopper threads
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// How long to simulate, in seconds
    #[arg(short, long, default_value = "5")]
    duration: u64,

    /// Window period of every aggregator, in milliseconds
    #[arg(short, long, default_value = "2000")]
    window: u64,

    /// Print aggregator statistics in Prometheus format at exit
    #[arg(long)]
    prometheus: bool,
}

/// All service façades, sharing one sink.
#[derive(Clone)]
struct Services {
    ad: AdAggregator,
    cart: CartAggregator,
    catalog: CatalogAggregator,
    checkout: CheckoutAggregator,
    currency: CurrencyAggregator,
    email: EmailAggregator,
    payment: PaymentAggregator,
    recommendation: RecommendationAggregator,
    shipping: ShippingAggregator,
    storefront: StorefrontAggregator,
}

fn start<S: Service>(sink: &Arc<dyn Sink>, window: Duration) -> riepilogo::Result<S> {
    S::builder()
        .config(S::default_config().with_window(window))
        .shared_sink(Arc::clone(sink))
        .build()
        .map(S::from_aggregator)
}

impl Services {
    fn start(sink: Arc<dyn Sink>, window: Duration) -> riepilogo::Result<Self> {
        Ok(Self {
            ad: start(&sink, window)?,
            cart: start(&sink, window)?,
            catalog: start(&sink, window)?,
            checkout: start(&sink, window)?,
            currency: start(&sink, window)?,
            email: start(&sink, window)?,
            payment: start(&sink, window)?,
            recommendation: start(&sink, window)?,
            shipping: start(&sink, window)?,
            storefront: start(&sink, window)?,
        })
    }

    /// Stops every timer and flushes what is left in the windows.
    fn shutdown(&self) {
        self.ad.aggregator().shutdown();
        self.cart.aggregator().shutdown();
        self.catalog.aggregator().shutdown();
        self.checkout.aggregator().shutdown();
        self.currency.aggregator().shutdown();
        self.email.aggregator().shutdown();
        self.payment.aggregator().shutdown();
        self.recommendation.aggregator().shutdown();
        self.shipping.aggregator().shutdown();
        self.storefront.aggregator().shutdown();
    }

    fn stats(&self) -> Vec<StatsSnapshot> {
        vec![
            self.ad.aggregator().stats(),
            self.cart.aggregator().stats(),
            self.catalog.aggregator().stats(),
            self.checkout.aggregator().stats(),
            self.currency.aggregator().stats(),
            self.email.aggregator().stats(),
            self.payment.aggregator().stats(),
            self.recommendation.aggregator().stats(),
            self.shipping.aggregator().stats(),
            self.storefront.aggregator().stats(),
        ]
    }
}

const PRODUCTS: [&str; 6] = [
    "OLJCESPC7Z",
    "66VCHSJNUP",
    "1YMWWN1N4O",
    "L9ECAV7KIM",
    "2ZYFJ3GM2N",
    "0PUK6V6EV0",
];
const CURRENCIES: [&str; 4] = ["USD", "EUR", "JPY", "CAD"];
const STATES: [&str; 4] = ["CA", "NY", "WA", ""];
const CARDS: [&str; 3] = ["visa", "mastercard", "amex"];
const CATEGORIES: [&str; 3] = ["clothing", "kitchen", "vintage"];

/// One simulated shopper visit. `n` drives every choice so runs are repeatable.
fn visit(services: &Services, shopper: usize, n: usize) {
    let user = format!("user-{shopper}");
    let product = PRODUCTS[n % PRODUCTS.len()];
    let currency = CURRENCIES[n % CURRENCIES.len()];

    services.storefront.product_view(product);
    services.catalog.product_view(product);
    services.recommendation.request(&PRODUCTS[..1 + n % 4]);
    services.ad.request(&CATEGORIES[..1 + n % 2], 2);
    services.ad.served(Some(CATEGORIES[n % CATEGORIES.len()]));

    if n % 97 == 0 {
        services.catalog.product_not_found("UNKNOWN-SKU");
    }
    if n % 13 == 0 {
        services.storefront.currency_change(currency);
        services.currency.conversion("USD", currency);
    }

    let quantity = (n % 7) as u32 + 1;
    services.cart.add(&user, product, quantity);
    services.cart.view(&user, &format!("cart-{shopper}"), quantity * 2);
    if n % 50 == 0 {
        services
            .cart
            .error(CartOperation::Add, &user, "cart store unavailable");
    }

    if n % 3 != 0 {
        return;
    }

    services.storefront.checkout_start();
    let total = Money::new(currency, 20 + (n % 80) as i64, 990_000_000);
    let address = Address {
        street_address: "1600 Amphitheatre Parkway".into(),
        city: "Mountain View".into(),
        state: STATES[n % STATES.len()].into(),
        country: "United States".into(),
        zip_code: 94043,
    };
    services
        .shipping
        .quote_request(Some(&address), Some(&Money::new("USD", 8, 990_000_000)));

    let paid = n % 11 != 0;
    let order_id = format!("order-{shopper}-{n}");
    services.payment.transaction(&Transaction {
        success: paid,
        amount: &total,
        card_type: CARDS[n % CARDS.len()],
        card_last_four: "0454",
        transaction_id: paid.then_some(order_id.as_str()),
        failure_reason: (!paid).then_some("card declined"),
    });
    services.checkout.record_order(&Order {
        order_id: &order_id,
        user_id: &user,
        total: &total,
        currency,
        item_count: quantity,
        transaction_id: &order_id,
        status: if paid {
            OrderStatus::Completed
        } else {
            OrderStatus::Failed
        },
    });

    if paid {
        services.storefront.order_complete(total.amount(), currency);
        services.shipping.shipping_order(Some(&address), &order_id);
        services.cart.empty(&user);
        services.email.sent(&format!("{user}@example.com"));
    } else {
        services.checkout.payment_failed(&order_id, "card declined");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let sink: Arc<dyn Sink> = match args.format {
        OutputFormat::Tracing => Arc::new(TracingSink::new()),
        OutputFormat::Json => Arc::new(JsonSink::stdout().pretty(args.pretty)),
        OutputFormat::Table => Arc::new(TableSink::stdout().with_style(args.style.into())),
    };

    let services = Services::start(sink, Duration::from_millis(args.window))?;
    services.catalog.catalog_operation("reload_catalog", PRODUCTS.len(), OperationStatus::Success);

    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let handles: Vec<_> = (0..args.threads)
        .map(|shopper| {
            let services = services.clone();
            thread::spawn(move || {
                let mut n = shopper;
                while Instant::now() < deadline {
                    visit(&services, shopper, n);
                    n += 1;
                    thread::sleep(Duration::from_millis(5));
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("shopper thread panicked");
        }
    }

    services.shutdown();

    let stats = services.stats();
    if args.prometheus {
        let exporter = StatsExporter::new()
            .with_namespace("storefront")
            .with_const_label("instance", "demo");
        print!("{}", exporter.render(&stats)?);
    } else {
        for snapshot in &stats {
            eprintln!("{}", serde_json::to_string(snapshot)?);
        }
    }

    Ok(())
}
