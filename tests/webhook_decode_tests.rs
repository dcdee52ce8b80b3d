/// Decoder tests for the WhatsApp webhook envelope
/// Exercise the messages classification and the ordering guarantees the
/// downstream pipeline relies on.
use wmg_api::webhook_models::IncomingMessageWebhook;

fn message_json(id: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "from": "15557772222",
        "id": id,
        "timestamp": "1700000000",
        "type": "text",
        "text": { "body": body }
    })
}

fn messages_change(phone_number_id: &str, messages: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "field": "messages",
        "value": {
            "messaging_product": "whatsapp",
            "metadata": {
                "display_phone_number": "15550001111",
                "phone_number_id": phone_number_id
            },
            "messages": messages
        }
    })
}

#[test]
fn envelope_without_messages_changes_is_a_no_op() {
    let json = serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [
            {
                "id": "1",
                "changes": [
                    { "field": "statuses", "value": { "statuses": [] } },
                    { "field": "message_template_status_update", "value": { "event": "APPROVED" } }
                ]
            }
        ]
    });

    let webhook: IncomingMessageWebhook = serde_json::from_value(json).unwrap();
    assert!(!webhook.has_messages());
    assert!(webhook.messages().is_empty());
}

#[test]
fn envelope_without_entries_decodes_empty() {
    let webhook: IncomingMessageWebhook =
        serde_json::from_value(serde_json::json!({ "object": "whatsapp_business_account" }))
            .unwrap();
    assert!(!webhook.has_messages());
    assert!(webhook.messages().is_empty());
}

#[test]
fn message_order_is_preserved_across_entries_and_changes() {
    let json = serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [
            {
                "id": "entry-1",
                "changes": [
                    messages_change("biz-1", vec![message_json("m1", "a"), message_json("m2", "b")]),
                    messages_change("biz-2", vec![message_json("m3", "c")])
                ]
            },
            {
                "id": "entry-2",
                "changes": [
                    messages_change("biz-3", vec![message_json("m4", "d"), message_json("m5", "e")])
                ]
            }
        ]
    });

    let webhook: IncomingMessageWebhook = serde_json::from_value(json).unwrap();
    assert!(webhook.has_messages());

    let messages = webhook.messages();
    let ids: Vec<&str> = messages.iter().map(|(_, m)| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "m5"]);

    let businesses: Vec<&str> = messages.iter().map(|(b, _)| *b).collect();
    assert_eq!(businesses, vec!["biz-1", "biz-1", "biz-2", "biz-3", "biz-3"]);
}

#[test]
fn non_messages_changes_are_skipped_between_message_changes() {
    let json = serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [
            {
                "id": "entry-1",
                "changes": [
                    messages_change("biz-1", vec![message_json("m1", "a")]),
                    { "field": "statuses", "value": { "statuses": [ { "id": "m1", "status": "read" } ] } },
                    messages_change("biz-1", vec![message_json("m2", "b")])
                ]
            }
        ]
    });

    let webhook: IncomingMessageWebhook = serde_json::from_value(json).unwrap();
    let ids: Vec<&str> = webhook.messages().iter().map(|(_, m)| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert_eq!(webhook.message_values().len(), 2);
}

#[test]
fn mixed_message_types_decode_alongside_text() {
    let json = serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [
            {
                "id": "entry-1",
                "changes": [
                    messages_change(
                        "biz-1",
                        vec![
                            serde_json::json!({
                                "from": "15557772222",
                                "id": "m-img",
                                "timestamp": 1700000050,
                                "type": "image"
                            }),
                            message_json("m-text", "hola")
                        ]
                    )
                ]
            }
        ]
    });

    let webhook: IncomingMessageWebhook = serde_json::from_value(json).unwrap();
    let messages = webhook.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].1.message_type, "image");
    assert_eq!(messages[0].1.text_body(), None);
    assert_eq!(messages[1].1.text_body(), Some("hola"));
}

#[test]
fn referral_payload_round_trips_through_stringify() {
    let json = serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [
            {
                "id": "entry-1",
                "changes": [
                    {
                        "field": "messages",
                        "value": {
                            "metadata": { "phone_number_id": "biz-1" },
                            "messages": [
                                {
                                    "from": "15557772222",
                                    "id": "m1",
                                    "timestamp": "1700000000",
                                    "type": "text",
                                    "text": { "body": "hello" },
                                    "referral": {
                                        "ctwa_clid": "clid-42",
                                        "source_id": "ad-9",
                                        "source_type": "ad",
                                        "source_url": "https://fb.me/abc",
                                        "headline": "Big sale",
                                        "body": "Save now",
                                        "media_type": "image",
                                        "image_url": "https://cdn/img.jpg"
                                    }
                                }
                            ]
                        }
                    }
                ]
            }
        ]
    });

    let webhook: IncomingMessageWebhook = serde_json::from_value(json).unwrap();
    let messages = webhook.messages();
    let referral = messages[0].1.referral.as_ref().unwrap();

    let raw = referral.stringify().unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(reparsed["ctwa_clid"], "clid-42");
    assert_eq!(reparsed["source_id"], "ad-9");
    assert_eq!(reparsed["headline"], "Big sale");
    // Absent optional fields are omitted, not serialized as null.
    assert!(reparsed.get("video_url").is_none());
}
