mod common;

use common::*;
use sca_wan::regs::*;
use sca_wan::{
    AddressFamily, CoherentMemory, Controller, OutboundPacket, PortLayout, PortState, ScaConfig,
    ScaError,
};

#[test]
fn attach_resets_chip_and_leaves_ports_down() {
    let ctl = attach(ScaConfig::default(), 2);
    let regs = ctl.regs();

    assert_eq!(regs.get(DMER), DMER_EN);
    assert_eq!(regs.get(IER0), 0);
    assert_eq!(regs.get(IER1), 0);
    assert_eq!(regs.get(ITCR), ITCR_INTR_PRI_MSCI);
    assert_eq!(regs.get(PCR), PCR_PR2);

    for port in 0..2 {
        assert_eq!(regs.get(msci_reg(port, MD0)), 0x87);
        assert_eq!(regs.get(msci_reg(port, IDL)), IDLE_PATTERN);
        assert_eq!(regs.get(msci_reg(port, RRC)), RRC_DEFAULT);
        assert_eq!(regs.get(msci_reg(port, TRC0)), 0);
        assert_eq!(regs.get(msci_reg(port, TRC1)), TRC_MAX);
        assert_eq!(regs.get(msci_reg(port, RXS)), 0x40);
        assert_eq!(regs.get(msci_reg(port, TMC)), 0x10);
        assert_eq!(regs.get(msci_reg(port, CTL)) & CTL_RTS_MASK, CTL_RTS_LOW);

        let p = ctl.port(port).unwrap();
        assert_eq!(p.state(), PortState::Down);
        assert_eq!(regs.get(tx_reg(port, CPB)), p.tx_ring().chain_base());
        assert_eq!(regs.get(rx_reg(port, CPB)), p.rx_ring().chain_base());
        assert_eq!(regs.get16(rx_reg(port, CDAL)), p.rx_ring().desc_low16(0));
        assert_eq!(regs.get16(rx_reg(port, EDAL)), p.rx_ring().desc_low16(15));
        assert_eq!(regs.get16(rx_reg(port, BFLL)), 1504);
        assert_eq!(regs.get(rx_reg(port, DSR)), DmaStatus::DE.bits());
    }
    assert_eq!(ctl.platform().clock_calls, vec![(0, true), (1, false)]);
}

#[test]
fn attach_rejects_bad_port_counts_and_configs() {
    let cfg = ScaConfig::default();
    for count in [0, 3] {
        let res = Controller::attach(
            FakeRegs::new(),
            CoherentMemory::new(0, 0x4_0000),
            FakePlatform::default(),
            FakeStack::default(),
            cfg.clone(),
            port_configs(&cfg, count),
        );
        assert!(matches!(res, Err(ScaError::PortCount(n)) if n == count));
    }

    let zero = ScaConfig {
        tx_descriptors: 0,
        ..ScaConfig::default()
    };
    let res = Controller::attach(
        FakeRegs::new(),
        CoherentMemory::new(0, 0x4_0000),
        FakePlatform::default(),
        FakeStack::default(),
        zero,
        port_configs(&cfg, 1),
    );
    assert!(matches!(res, Err(ScaError::InvalidConfig(_))));

    let mut ports = port_configs(&cfg, 1);
    ports[0].layout.rx_desc = 0x1_fff0;
    let res = Controller::attach(
        FakeRegs::new(),
        CoherentMemory::new(0, 0x4_0000),
        FakePlatform::default(),
        FakeStack::default(),
        cfg,
        ports,
    );
    assert!(matches!(res, Err(ScaError::RingLayout(_))));
}

#[test]
fn port_up_raises_signals_and_enables_interrupts() {
    let mut ctl = attach(ScaConfig::default(), 2);
    ctl.platform_mut().micros = 4242;
    ctl.port_up(1).unwrap();

    let regs = ctl.regs();
    assert_eq!(regs.get(IER0), 0xf0);
    assert_eq!(regs.get(IER1), 0xf0);
    assert_eq!(regs.get(msci_reg(1, CTL)) & CTL_RTS_MASK, CTL_RTS_HIGH);
    assert_eq!(regs.get(msci_reg(0, CTL)) & CTL_RTS_MASK, CTL_RTS_LOW);
    let cmds: Vec<u8> = regs
        .writes
        .iter()
        .filter(|(offset, _)| *offset == msci_reg(1, CMD))
        .map(|&(_, value)| value)
        .collect();
    assert_eq!(&cmds[cmds.len() - 2..], &[CMD_TXENABLE, CMD_RXENABLE]);
    assert_eq!(ctl.platform().dtr, [false, true]);

    let port = ctl.port(1).unwrap();
    assert!(port.is_up());
    assert!(!port.tx_busy());
    assert_eq!(port.tx_in_use(), 0);
    assert_eq!(port.keepalive_last_tx_seq(), 0);
    assert_eq!(port.keepalive_last_rx_seq(), 0);
    assert_eq!(port.keepalive_last_sent(), 4242);
}

#[test]
fn port_down_restores_signals_and_masks_only_its_interrupts() {
    let mut ctl = attach(ScaConfig::default(), 2);
    ctl.port_up(0).unwrap();
    ctl.port_up(1).unwrap();
    ctl.port_down(0).unwrap();

    let regs = ctl.regs();
    assert_eq!(regs.get(IER0), 0xf0);
    assert_eq!(regs.get(IER1), 0xf0);
    assert_eq!(regs.get(msci_reg(0, CTL)) & CTL_RTS_MASK, CTL_RTS_LOW);
    let last_cmds: Vec<u8> = regs
        .writes
        .iter()
        .filter(|(offset, _)| *offset == msci_reg(0, CMD))
        .map(|&(_, value)| value)
        .rev()
        .take(2)
        .collect();
    assert_eq!(last_cmds, vec![CMD_TXDISABLE, CMD_RXDISABLE]);
    assert_eq!(ctl.platform().dtr, [false, true]);
    assert_eq!(ctl.port(0).unwrap().state(), PortState::Down);
    assert!(ctl.port(1).unwrap().is_up());

    assert_eq!(ctl.port_up(2), Err(ScaError::NoSuchPort(2)));
}

#[test]
fn output_requires_an_up_port() {
    let mut ctl = attach(ScaConfig::default(), 1);
    let packet = OutboundPacket {
        family: AddressFamily::Inet,
        payload: vec![0x45; 20],
        multicast: false,
    };
    assert_eq!(ctl.output(0, packet.clone()), Err(ScaError::NetworkDown));
    assert_eq!(
        ctl.enqueue_outbound(0, vec![0x0f, 0, 8, 0]),
        Err(ScaError::NetworkDown)
    );

    ctl.port_up(0).unwrap();
    ctl.output(0, packet).unwrap();
    ctl.port_down(0).unwrap();
    assert!(!ctl.port(0).unwrap().tx_busy());
}

#[test]
fn completion_after_port_down_leaves_the_transmitter_stopped() {
    let mut ctl = attach_up(ScaConfig::default());
    let packet = |fill| OutboundPacket {
        family: AddressFamily::Inet,
        payload: vec![fill; 20],
        multicast: false,
    };
    ctl.output(0, packet(1)).unwrap();
    ctl.output(0, packet(2)).unwrap();
    assert_eq!(ctl.port(0).unwrap().queued(), (0, 0, 1));

    ctl.port_down(0).unwrap();
    let port = ctl.port(0).unwrap();
    assert!(!port.tx_busy());
    assert_eq!(port.tx_in_use(), 0);
    assert_eq!(port.tx_current(), 0);

    // The batch handed over before the port went down still completes.
    hw_tx_complete(&mut ctl, 0);
    ctl.hardware_interrupt();

    let port = ctl.port(0).unwrap();
    assert_eq!(port.state(), PortState::Down);
    assert!(!port.tx_busy());
    assert_eq!(port.tx_in_use(), 0);
    assert_eq!(port.queued(), (0, 0, 1));
    assert_eq!(ctl.regs().get(tx_reg(0, DSR)) & DmaStatus::DE.bits(), 0);

    ctl.port_up(0).unwrap();
    ctl.start(0).unwrap();
    let port = ctl.port(0).unwrap();
    assert!(port.tx_busy());
    assert_eq!(port.tx_in_use(), 1);
    assert_eq!(port.queued(), (0, 0, 0));
    assert_eq!(&tx_frame(&mut ctl, 0, 0)[4..], &[2u8; 20][..]);
}

#[test]
fn shutdown_disables_dma_and_interrupts() {
    let mut ctl = attach_up(ScaConfig::default());
    ctl.shutdown();
    assert_eq!(ctl.regs().get(DMER), 0);
    assert_eq!(ctl.regs().get(IER0), 0);
    assert_eq!(ctl.regs().get(IER1), 0);
}

#[test]
fn underruns_raise_the_fifo_threshold_up_to_its_maximum() {
    let mut ctl = attach_up(ScaConfig::default());
    let st1 = msci_reg(0, ST1);
    let trc0 = msci_reg(0, TRC0);

    ctl.regs_mut().set(st1, ST1_UDRN);
    assert_eq!(ctl.hardware_interrupt(), 1);
    assert_eq!(ctl.regs().get(trc0), 2);
    assert_eq!(ctl.regs().get(st1), 0);

    ctl.regs_mut().set(trc0, 0x1e);
    ctl.regs_mut().set(st1, ST1_UDRN);
    ctl.hardware_interrupt();
    assert_eq!(ctl.regs().get(trc0), TRC_MAX);

    ctl.regs_mut().set(st1, ST1_UDRN);
    ctl.hardware_interrupt();
    assert_eq!(ctl.regs().get(trc0), TRC_MAX);
    assert_eq!(ctl.stats(0).unwrap().tx_underruns, 3);
}

#[test]
fn idle_interrupt_line_reports_nothing_handled() {
    let mut ctl = attach_up(ScaConfig::default());
    assert_eq!(ctl.hardware_interrupt(), 0);
}

#[test]
fn contiguous_layout_fits_the_test_memory_map() {
    let cfg = ScaConfig::default();
    let layout = PortLayout::contiguous(port_base(0), &cfg);
    assert!(layout.rx_buf as usize + 16 * 1504 <= port_base(1) as usize);
}
