use prost::Message;
use std::net::UdpSocket;
use std::time::Duration;
use std::thread;
use territory_server::protocol::client::{
    ClientMessage, Join, Ping, Turn,
    client_message::Payload,
};
use territory_server::protocol::common;
use territory_server::protocol::server::{ServerMessage, server_message};

fn main() -> std::io::Result<()> {
    let socket = UdpSocket::bind("127.0.0.1:0")?;
    socket.set_read_timeout(Some(Duration::from_secs(2)))?;
    let server_addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:9000".to_string());

    // 1. Join with a fresh identity
    let join_msg = ClientMessage {
        payload: Some(Payload::Join(Join {
            participant_id: String::new(),
        })),
    };
    socket.send_to(&join_msg.encode_to_vec(), &server_addr)?;
    println!("Sent: Join");

    receive_response(&socket);

    // 2. Ping
    let ping_msg = ClientMessage {
        payload: Some(Payload::Ping(Ping {
            timestamp: 0,
            sequence: 1,
        })),
    };
    socket.send_to(&ping_msg.encode_to_vec(), &server_addr)?;
    println!("Sent: Ping");

    // 3. Walk a small square: four right turns spaced apart
    for i in 0..4 {
        thread::sleep(Duration::from_millis(300));
        let turn_msg = ClientMessage {
            payload: Some(Payload::Turn(Turn {
                turn: common::Turn::Right as i32,
            })),
        };
        socket.send_to(&turn_msg.encode_to_vec(), &server_addr)?;
        println!("Sent: Turn right {}", i);
        receive_response(&socket);
    }

    println!("Done!");
    Ok(())
}

fn receive_response(socket: &UdpSocket) {
    let mut buf = vec![0u8; 65_536];
    match socket.recv_from(&mut buf) {
        Ok((len, _)) => match ServerMessage::decode(&buf[..len]).map(|m| m.payload) {
            Ok(Some(server_message::Payload::Frame(frame))) => {
                let owned = frame.owners.iter().filter(|&&o| o != 0).count();
                println!(
                    "Received: Frame tick={} {}x{} players={} owned_cells={}",
                    frame.tick,
                    frame.width,
                    frame.height,
                    frame.players.len(),
                    owned
                );
                for player in &frame.players {
                    println!("  {:?}", player);
                }
            }
            Ok(Some(other)) => println!("Received: {:?}", other),
            Ok(None) => println!("Received empty message"),
            Err(_) => println!("Received {} bytes (failed to decode)", len),
        },
        Err(e) => println!("No response: {}", e),
    }
}
