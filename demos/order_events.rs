use fakepub::{FakePublisher, Message, Publisher, PublisherConfig, Scoped};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Serialize, Debug)]
struct OrderPlaced {
    order_id: u32,
    customer: String,
    total_cents: u64,
}

fn place_orders(publisher: &dyn Publisher) -> fakepub::Result<()> {
    let orders = [
        OrderPlaced {
            order_id: 1,
            customer: "alice".to_string(),
            total_cents: 1250,
        },
        OrderPlaced {
            order_id: 2,
            customer: "bob".to_string(),
            total_cents: 800,
        },
    ];

    let mut batch = Vec::with_capacity(orders.len());
    for order in &orders {
        let payload = serde_json::to_vec(order)
            .map_err(|e| fakepub::Error::Serialization(e.to_string()))?;
        batch.push(Some(
            Message::new("/orders/placed", payload).with_key(order.customer.clone()),
        ));
    }
    publisher.publish_batch(batch)?;

    publisher.publish(Some(Message::new("/shipping/requested", "order 1")))?;
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    // `order_events <config.json>` runs against the configured backend,
    // no argument runs against the in-memory fake and prints what it recorded.
    if let Some(path) = args.get(1) {
        let config = match std::fs::read_to_string(path)
            .map_err(fakepub::Error::from)
            .and_then(|json| PublisherConfig::from_json(&json))
        {
            Ok(c) => c,
            Err(e) => {
                println!("Failed to load config: {}", e);
                return;
            }
        };

        let publisher = match config.build() {
            Ok(p) => Scoped::new(p),
            Err(e) => {
                println!("Failed to build publisher: {}", e);
                return;
            }
        };

        if let Err(e) = place_orders(&**publisher) {
            println!("Failed to publish orders: {}", e);
        }
        return;
    }

    let fake = Arc::new(FakePublisher::new());
    {
        let publisher = Scoped::new(Arc::clone(&fake));
        if let Err(e) = place_orders(&*publisher) {
            println!("Failed to publish orders: {}", e);
            return;
        }
    }

    for topic in fake.topics() {
        println!("{}:", topic);
        for message in fake.get_messages(topic.clone()) {
            println!("  {}", String::from_utf8_lossy(&message.payload));
        }
    }
    println!("{:?}", fake.stats());
}
