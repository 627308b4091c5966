use baywake::Error;
use baywake::bays::Bay;
use baywake::device::{Action, BayActuator, NetworkActuator, Outcome, PjLinkClient, PjLinkOptions, WakeOnLan};
use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpListener, UdpSocket};
use std::thread;
use std::time::Duration;

/// One-shot projector: sends `banner`, reads one CR-terminated command,
/// answers `reply`, and returns the command it received.
fn projector(banner: &'static str, reply: &'static str) -> (u16, thread::JoinHandle<String>) {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(banner.as_bytes()).unwrap();

        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut command = Vec::new();
        reader.read_until(b'\r', &mut command).unwrap();

        stream.write_all(reply.as_bytes()).unwrap();
        String::from_utf8(command).unwrap()
    });

    (port, handle)
}

fn client(port: u16) -> PjLinkClient {
    PjLinkClient::new(PjLinkOptions {
        port,
        timeout: Duration::from_secs(2),
    })
}

#[test]
fn test_power_on_over_loopback() {
    let (port, projector) = projector("PJLINK 0\r", "%1POWR=OK\r");

    let reply = client(port).power_on(Ipv4Addr::LOCALHOST.into()).unwrap();

    assert_eq!(reply, "%1POWR=OK");
    assert_eq!(projector.join().unwrap(), "%1POWR 1\r");
}

#[test]
fn test_raw_command_returns_status_reply() {
    let (port, projector) = projector("PJLINK 0\r\n", "%1POWR=1\r\n");

    let reply = client(port)
        .send(Ipv4Addr::LOCALHOST.into(), "%1POWR ?")
        .unwrap();

    assert_eq!(reply, "%1POWR=1");
    assert_eq!(projector.join().unwrap(), "%1POWR ?\r");
}

#[test]
fn test_device_error_reply() {
    let (port, projector) = projector("PJLINK 0\r", "%1POWR=ERR3\r");

    let result = client(port).power_off(Ipv4Addr::LOCALHOST.into());

    match result {
        Err(Error::Device { code, .. }) => assert_eq!(code, "ERR3"),
        other => panic!("expected device error, got {other:?}"),
    }
    projector.join().unwrap();
}

#[test]
fn test_refused_connection_is_connection_error() {
    // Bind and drop to get a port nothing listens on
    let port = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .unwrap()
        .local_addr()
        .unwrap()
        .port();

    let result = client(port).power_on(Ipv4Addr::LOCALHOST.into());
    assert!(matches!(result, Err(Error::Connection(_))));
}

#[test]
fn test_silent_projector_times_out() {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    let holder = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_millis(800));
        drop(stream);
    });

    let client = PjLinkClient::new(PjLinkOptions {
        port,
        timeout: Duration::from_millis(200),
    });
    let result = client.power_on(Ipv4Addr::LOCALHOST.into());

    assert!(matches!(result, Err(Error::Timeout(_))));
    holder.join().unwrap();
}

#[test]
fn test_actuator_sleep_powers_off_projector() {
    let (port, projector) = projector("PJLINK 0\r", "%1POWR=OK\r");
    let actuator = NetworkActuator::new(WakeOnLan::default(), client(port), true);
    let bay = Bay {
        id: "101".to_string(),
        reference: "BAY-1".to_string(),
        hardware_address: "00:11:22:33:44:55".parse().unwrap(),
        network_address: Some(Ipv4Addr::LOCALHOST.into()),
        range: None,
    };

    let outcome = actuator.actuate(&bay, Action::Sleep).unwrap();

    assert_eq!(outcome, Outcome::PoweredOff("%1POWR=OK".to_string()));
    assert_eq!(projector.join().unwrap(), "%1POWR 0\r");
}

#[test]
fn test_actuator_wake_sends_packet_then_powers_on() {
    let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let wol = WakeOnLan::new(Ipv4Addr::LOCALHOST, receiver.local_addr().unwrap().port());

    let (port, projector) = projector("PJLINK 0\r", "%1POWR=OK\r");
    let actuator = NetworkActuator::new(wol, client(port), true);
    let bay = Bay {
        id: "101".to_string(),
        reference: "BAY-1".to_string(),
        hardware_address: "00:11:22:33:44:55".parse().unwrap(),
        network_address: Some(Ipv4Addr::LOCALHOST.into()),
        range: None,
    };

    let outcome = actuator.actuate(&bay, Action::Wake).unwrap();

    assert_eq!(outcome, Outcome::WakeSentPoweredOn("%1POWR=OK".to_string()));
    let mut packet = [0u8; 128];
    let (len, _) = receiver.recv_from(&mut packet).unwrap();
    assert_eq!(len, 102);
    assert_eq!(&packet[6..12], &[0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
    assert_eq!(projector.join().unwrap(), "%1POWR 1\r");
}
