use domain::{InternalMessageFormat, MessageValue, RawUplink};

#[test]
fn raw_uplink_builds() {
    let uplink = RawUplink::new("senlabt", vec![0x01, 0x02], "2022-03-28T12:40:40Z");

    assert_eq!(uplink.device_type, "senlabt");
    assert_eq!(uplink.payload, vec![0x01, 0x02]);
    assert_eq!(uplink.received_at, "2022-03-28T12:40:40Z");
}

#[test]
fn internal_message_uses_wire_names() {
    let msg = InternalMessageFormat {
        internal_id: "70b3d580a010f260".to_string(),
        measurement_type: "urn:oma:lwm2m:ext:3303".to_string(),
        value: MessageValue { temperature: 2.0 },
    };

    let json = serde_json::to_value(&msg).expect("serialize");
    assert_eq!(json["internalID"], "70b3d580a010f260");
    assert_eq!(json["type"], "urn:oma:lwm2m:ext:3303");
    assert_eq!(json["value"]["temperature"], 2.0);
}
