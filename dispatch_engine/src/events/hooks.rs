use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DeliveryCodeIssuedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub code_issued_producer: Vec<EventProducer<DeliveryCodeIssuedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_status_changed(&self, event: OrderStatusChangedEvent) {
        for producer in &self.status_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_code_issued(&self, event: DeliveryCodeIssuedEvent) {
        for producer in &self.code_issued_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_code_issued: Option<EventHandler<DeliveryCodeIssuedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_created = hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f));
        let on_status_changed = hooks.on_status_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_code_issued = hooks.on_code_issued.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_created, on_status_changed, on_code_issued }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_status_changed {
            result.status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_code_issued {
            result.code_issued_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_code_issued {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_code_issued: Option<Handler<DeliveryCodeIssuedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_code_issued<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DeliveryCodeIssuedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_code_issued = Some(Arc::new(f));
        self
    }
}
