//! Plain-text and HTML rendering of the order invoice email.

use std::fmt::Write;

use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub customization_fee: Decimal,
}

impl InvoiceLine {
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity) + self.customization_fee
    }
}

/// Everything the invoice mail needs, captured at commit time.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub order_id: String,
    pub recipient: String,
    pub customer_name: String,
    pub payment_method: String,
    pub lines: Vec<InvoiceLine>,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl Invoice {
    pub fn subject(&self) -> String {
        format!("Your order {} has been placed", self.order_id)
    }

    pub fn text_body(&self) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "Hello {},", self.customer_name);
        let _ = writeln!(body, "Thank you for your order {}.", self.order_id);
        let _ = writeln!(body);
        for line in &self.lines {
            let _ = writeln!(
                body,
                "{} x{} @ {} = {}",
                line.product_id,
                line.quantity,
                line.unit_price,
                line.total()
            );
        }
        let _ = writeln!(body, "Shipping: {}", self.shipping_fee);
        if self.discount > Decimal::ZERO {
            let _ = writeln!(body, "Discount: -{}", self.discount);
        }
        let _ = writeln!(body, "Total: {}", self.total);
        let _ = writeln!(body, "Payment method: {}", self.payment_method);
        body
    }

    pub fn html_body(&self) -> String {
        let mut rows = String::new();
        for line in &self.lines {
            let _ = write!(
                rows,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&line.product_id),
                line.quantity,
                line.unit_price,
                line.total()
            );
        }
        format!(
            "<p>Hello {name},</p>\
             <p>Thank you for your order <strong>{order}</strong>.</p>\
             <table><tr><th>Product</th><th>Qty</th><th>Price</th><th>Line total</th></tr>{rows}</table>\
             <p>Shipping: {shipping}</p><p>Discount: {discount}</p>\
             <p><strong>Total: {total}</strong></p><p>Payment method: {method}</p>",
            name = escape(&self.customer_name),
            order = escape(&self.order_id),
            shipping = self.shipping_fee,
            discount = self.discount,
            total = self.total,
            method = escape(&self.payment_method),
        )
    }
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
